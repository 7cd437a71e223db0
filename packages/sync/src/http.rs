//! # HTTP Persistence Client
//!
//! [`PersistenceService`] over a JSON HTTP backend. One POST route per
//! operation, bearer-token auth, no retries. Retry policy belongs to the
//! reconciler's dirty tracking, which simply re-offers failed entities on
//! the next cycle.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::remote::{
    DocumentUpsert, GrammarPointRecord, GrammarPointUpsert, PersistenceService, RemoteError,
    RemoteResult, SentenceRecord, SentenceUpsert, WordRecord, WordUpsert,
};

#[derive(Debug, Clone)]
pub struct HttpPersistenceService {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPersistenceService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> RemoteResult<Resp> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::http(status.as_u16(), path));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| RemoteError::decode(e.to_string()))
    }

    /// POST for routes whose response body carries nothing we need.
    async fn post_unit<Req: Serialize>(&self, path: &str, body: &Req) -> RemoteResult<()> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::http(status.as_u16(), path));
        }
        Ok(())
    }
}

#[derive(Debug, serde::Serialize)]
struct DeleteManyRequest {
    ids: Vec<String>,
}

#[async_trait]
impl PersistenceService for HttpPersistenceService {
    async fn upsert_grammar_point(
        &self,
        request: GrammarPointUpsert,
    ) -> RemoteResult<GrammarPointRecord> {
        self.post_json("/grammar-points/upsert", &request).await
    }

    async fn delete_grammar_points(&self, ids: Vec<String>) -> RemoteResult<()> {
        self.post_unit("/grammar-points/delete-many", &DeleteManyRequest { ids })
            .await
    }

    async fn upsert_sentence(&self, request: SentenceUpsert) -> RemoteResult<SentenceRecord> {
        self.post_json("/sentences/upsert", &request).await
    }

    async fn delete_sentences(&self, ids: Vec<String>) -> RemoteResult<()> {
        self.post_unit("/sentences/delete-many", &DeleteManyRequest { ids })
            .await
    }

    async fn upsert_word(&self, request: WordUpsert) -> RemoteResult<WordRecord> {
        self.post_json("/words/upsert", &request).await
    }

    async fn delete_words(&self, ids: Vec<String>) -> RemoteResult<()> {
        self.post_unit("/words/delete-many", &DeleteManyRequest { ids })
            .await
    }

    async fn upsert_document(&self, request: DocumentUpsert) -> RemoteResult<()> {
        self.post_unit("/documents/upsert", &request).await
    }
}
