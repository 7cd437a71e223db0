//! In-memory [`PersistenceService`] that records every call, for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::remote::{
    DocumentUpsert, GrammarPointRecord, GrammarPointUpsert, PersistenceService, RemoteError,
    RemoteResult, SentenceRecord, SentenceUpsert, WordRecord, WordUpsert,
};

/// Everything the reconciler sent, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GrammarPointUpsert(GrammarPointUpsert),
    GrammarPointDelete(Vec<String>),
    SentenceUpsert(SentenceUpsert),
    SentenceDelete(Vec<String>),
    WordUpsert(WordUpsert),
    WordDelete(Vec<String>),
    DocumentUpsert(DocumentUpsert),
}

#[derive(Default)]
pub struct RecordingService {
    pub calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,

    /// Failure injection, one switch per operation family.
    pub fail_grammar_point_upserts: AtomicBool,
    pub fail_sentence_upserts: AtomicBool,
    pub fail_word_upserts: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_document_upserts: AtomicBool,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }

    fn failing(&self, flag: &AtomicBool, what: &str) -> RemoteResult<()> {
        if flag.load(Ordering::Relaxed) {
            Err(RemoteError::http(500, what))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceService for RecordingService {
    async fn upsert_grammar_point(
        &self,
        request: GrammarPointUpsert,
    ) -> RemoteResult<GrammarPointRecord> {
        self.calls
            .lock()
            .await
            .push(Call::GrammarPointUpsert(request.clone()));
        self.failing(&self.fail_grammar_point_upserts, "grammar point upsert")?;
        Ok(GrammarPointRecord {
            id: request.id.unwrap_or_else(|| self.fresh_id("gp")),
            title: request.title,
        })
    }

    async fn delete_grammar_points(&self, ids: Vec<String>) -> RemoteResult<()> {
        self.calls.lock().await.push(Call::GrammarPointDelete(ids));
        self.failing(&self.fail_deletes, "grammar point delete")
    }

    async fn upsert_sentence(&self, request: SentenceUpsert) -> RemoteResult<SentenceRecord> {
        self.calls
            .lock()
            .await
            .push(Call::SentenceUpsert(request.clone()));
        self.failing(&self.fail_sentence_upserts, "sentence upsert")?;
        Ok(SentenceRecord {
            id: request.id.unwrap_or_else(|| self.fresh_id("s")),
        })
    }

    async fn delete_sentences(&self, ids: Vec<String>) -> RemoteResult<()> {
        self.calls.lock().await.push(Call::SentenceDelete(ids));
        self.failing(&self.fail_deletes, "sentence delete")
    }

    async fn upsert_word(&self, request: WordUpsert) -> RemoteResult<WordRecord> {
        self.calls.lock().await.push(Call::WordUpsert(request.clone()));
        self.failing(&self.fail_word_upserts, "word upsert")?;
        Ok(WordRecord {
            id: request.id.unwrap_or_else(|| self.fresh_id("w")),
            word: request.word,
            translations: request.translations,
        })
    }

    async fn delete_words(&self, ids: Vec<String>) -> RemoteResult<()> {
        self.calls.lock().await.push(Call::WordDelete(ids));
        self.failing(&self.fail_deletes, "word delete")
    }

    async fn upsert_document(&self, request: DocumentUpsert) -> RemoteResult<()> {
        self.calls.lock().await.push(Call::DocumentUpsert(request));
        self.failing(&self.fail_document_upserts, "document upsert")
    }
}
