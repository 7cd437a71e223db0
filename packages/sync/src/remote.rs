//! # Remote Persistence Contract
//!
//! Operation shapes of the persistence service the reconciler talks to,
//! plus the wire codec for translation lists. Implementations: an HTTP
//! client ([`crate::http::HttpPersistenceService`]) and an in-memory
//! recording fake for tests ([`crate::fake::RecordingService`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Transport-level failure; the service was never reached.
    Network,
    /// The service answered with a non-success status.
    Http,
    /// The response body did not decode.
    Decode,
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn http(status: u16, context: &str) -> Self {
        Self {
            kind: RemoteErrorKind::Http,
            message: format!("{context} failed with status {status}"),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Decode,
            message: message.into(),
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrammarPointUpsert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub source_document_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrammarPointRecord {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentenceUpsert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub sentence: String,
    pub translation: String,
    pub containing_words: Vec<String>,
    pub language_id: String,
    pub source_document_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRecord {
    pub id: String,
}

/// Word payload. Translations cross the wire as one delimiter-joined string
/// (see [`join_translations`]); the typed constructor and accessor keep the
/// codec in one place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordUpsert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub word: String,
    /// `;`-joined, escaped translation list.
    pub translations: String,
    pub language_id: String,
}

impl WordUpsert {
    pub fn new(
        id: Option<String>,
        word: String,
        translations: &[String],
        language_id: String,
    ) -> Self {
        Self {
            id,
            word,
            translations: join_translations(translations),
            language_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    pub id: String,
    pub word: String,
    /// `;`-joined, escaped translation list.
    pub translations: String,
}

impl WordRecord {
    pub fn translation_list(&self) -> Vec<String> {
        split_translations(&self.translations)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpsert {
    pub id: String,
    pub title: String,
    pub serialized_document: String,
    pub language_id: String,
}

/// Join translations into the persisted single-column form. A literal `;`
/// inside a translation is escaped as `\;` (and `\` as `\\`) so the split
/// side can reverse it losslessly.
pub fn join_translations(translations: &[String]) -> String {
    translations
        .iter()
        .map(|t| t.replace('\\', "\\\\").replace(';', "\\;"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Inverse of [`join_translations`].
pub fn split_translations(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in raw.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == ';' {
            out.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    // A trailing lone backslash is kept rather than dropped.
    if escaped {
        current.push('\\');
    }
    out.push(current);
    out
}

/// Everything the reconciler needs from the backend.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn upsert_grammar_point(
        &self,
        request: GrammarPointUpsert,
    ) -> RemoteResult<GrammarPointRecord>;

    async fn delete_grammar_points(&self, ids: Vec<String>) -> RemoteResult<()>;

    async fn upsert_sentence(&self, request: SentenceUpsert) -> RemoteResult<SentenceRecord>;

    async fn delete_sentences(&self, ids: Vec<String>) -> RemoteResult<()>;

    async fn upsert_word(&self, request: WordUpsert) -> RemoteResult<WordRecord>;

    async fn delete_words(&self, ids: Vec<String>) -> RemoteResult<()>;

    async fn upsert_document(&self, request: DocumentUpsert) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translations_round_trip() {
        let cases: Vec<Vec<String>> = vec![
            vec![],
            vec!["house".to_string()],
            vec!["house".to_string(), "home".to_string()],
            // The delimiter itself inside a translation survives.
            vec!["first; second".to_string(), "third".to_string()],
            vec!["back\\slash".to_string(), "plain".to_string()],
            vec!["".to_string(), "".to_string()],
        ];
        for case in cases {
            let joined = join_translations(&case);
            assert_eq!(split_translations(&joined), case, "case: {case:?}");
        }
    }

    #[test]
    fn test_join_escapes_delimiter() {
        let joined = join_translations(&["a;b".to_string(), "c".to_string()]);
        assert_eq!(joined, "a\\;b;c");
    }

    #[test]
    fn test_split_legacy_unescaped_input() {
        // Rows written before escaping existed split on every delimiter.
        assert_eq!(
            split_translations("house;home"),
            vec!["house".to_string(), "home".to_string()]
        );
    }

    #[test]
    fn test_upsert_wire_shape_is_camel_case() {
        let request = SentenceUpsert {
            id: None,
            sentence: "vivo aquí".to_string(),
            translation: "I live here".to_string(),
            containing_words: vec!["w1".to_string()],
            language_id: "es".to_string(),
            source_document_id: "d1".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("containingWords").is_some());
        assert!(value.get("sourceDocumentId").is_some());
        // Absent id is omitted, not null, so the backend treats it as create.
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_word_upsert_joins_translations() {
        let request = WordUpsert::new(
            None,
            "casa".to_string(),
            &["house".to_string(), "home".to_string()],
            "es".to_string(),
        );
        assert_eq!(request.translations, "house;home");

        let record = WordRecord {
            id: "w1".to_string(),
            word: "casa".to_string(),
            translations: "house;home".to_string(),
        };
        assert_eq!(record.translation_list(), vec!["house", "home"]);
    }
}
