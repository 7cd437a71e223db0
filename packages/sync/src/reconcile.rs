//! # Reconciliation
//!
//! Diffs the outline index against the remote store and issues the minimal
//! set of upserts and batched deletes, writing returned ids back onto the
//! live tree. Best-effort: one failed entity never blocks the rest, and
//! editing is never gated on the network. Failures simply stay dirty for
//! the next cycle.
//!
//! Ordering within one cycle: grammar points, then words, then sentences.
//! Grammar points precede sentences (consistent call ordering); words
//! precede sentences so a sentence upsert can already carry the persisted
//! ids of words saved in the same cycle.

use glossa_document::NodeKey;
use glossa_editor::Command;

use crate::error::SyncError;
use crate::remote::{
    DocumentUpsert, GrammarPointUpsert, PersistenceService, RemoteError, SentenceUpsert,
    WordUpsert,
};
use crate::session::DocumentSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Word,
    Sentence,
    GrammarPoint,
}

/// One entity whose remote write failed this cycle. The entry stays
/// dirty/deleted in the index, so the next cycle retries it.
#[derive(Debug, Clone)]
pub struct ReconcileFailure {
    pub entity: EntityKind,
    pub key: NodeKey,
    pub error: RemoteError,
}

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// True when another cycle was already in flight and this call did
    /// nothing.
    pub skipped: bool,
    pub upserted: usize,
    pub deleted: usize,
    pub failed: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn is_complete_success(&self) -> bool {
        !self.skipped && self.failed.is_empty()
    }
}

impl DocumentSession {
    /// Persist the whole document, then reconcile the outline.
    ///
    /// A document-level failure surfaces as an error (the caller shows a
    /// notification); entity-level failures only appear in the report.
    pub async fn save(
        &mut self,
        service: &dyn PersistenceService,
    ) -> Result<ReconcileReport, SyncError> {
        let request = DocumentUpsert {
            id: self.meta.document_id.clone(),
            title: self.meta.title.clone(),
            serialized_document: glossa_document::serialize_string(self.editor.tree()),
            language_id: self.meta.language_id.clone(),
        };
        service.upsert_document(request).await?;
        Ok(self.reconcile(service).await)
    }

    /// One reconciliation cycle. Reentrant calls are skipped, not queued: a
    /// second save triggered while the first is on the wire reports
    /// `skipped` and leaves the index untouched.
    pub async fn reconcile(&mut self, service: &dyn PersistenceService) -> ReconcileReport {
        if self.reconciling {
            tracing::debug!("reconciliation already in flight; skipping");
            return ReconcileReport::skipped();
        }
        self.reconciling = true;
        let report = self.reconcile_cycle(service).await;
        self.reconciling = false;
        tracing::info!(
            upserted = report.upserted,
            deleted = report.deleted,
            failed = report.failed.len(),
            "reconciliation finished"
        );
        report
    }

    async fn reconcile_cycle(&mut self, service: &dyn PersistenceService) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        // Grammar points.
        let pending: Vec<_> = self
            .index
            .grammar_points
            .iter()
            .filter(|(_, e)| e.needs_upsert())
            .map(|(&k, e)| (k, e.snapshot.clone()))
            .collect();
        for (key, snapshot) in pending {
            let request = GrammarPointUpsert {
                id: snapshot.database_id.clone(),
                title: snapshot.title.clone(),
                source_document_id: self.meta.document_id.clone(),
            };
            match service.upsert_grammar_point(request).await {
                Ok(record) => {
                    self.index.mark_grammar_point_clean(key, &record.id);
                    self.write_back_id(key, &record.id);
                    report.upserted += 1;
                }
                Err(error) => {
                    tracing::warn!(%key, %error, "grammar point upsert failed");
                    report.failed.push(ReconcileFailure {
                        entity: EntityKind::GrammarPoint,
                        key,
                        error,
                    });
                }
            }
        }

        // Words, before sentences: a sentence saved below can then carry the
        // ids of words persisted in this same cycle.
        let pending: Vec<_> = self
            .index
            .words
            .iter()
            .filter(|(_, e)| e.needs_upsert())
            .map(|(&k, e)| (k, e.snapshot.clone()))
            .collect();
        for (key, snapshot) in pending {
            let request = WordUpsert::new(
                snapshot.database_id.clone(),
                snapshot.word.clone(),
                &snapshot.translations,
                self.meta.language_id.clone(),
            );
            match service.upsert_word(request).await {
                Ok(record) => {
                    self.index.mark_word_clean(key, &record.id);
                    self.write_back_id(key, &record.id);
                    report.upserted += 1;
                }
                Err(error) => {
                    tracing::warn!(%key, %error, "word upsert failed");
                    report.failed.push(ReconcileFailure {
                        entity: EntityKind::Word,
                        key,
                        error,
                    });
                }
            }
        }

        // Sentences, after the word id write-backs above refreshed their
        // contained-word sets.
        let pending: Vec<_> = self
            .index
            .sentences
            .iter()
            .filter(|(_, e)| e.needs_upsert())
            .map(|(&k, e)| (k, e.snapshot.clone()))
            .collect();
        for (key, snapshot) in pending {
            let request = SentenceUpsert {
                id: snapshot.database_id.clone(),
                sentence: snapshot.text.clone(),
                translation: snapshot.translation.clone(),
                containing_words: snapshot.word_ids.clone(),
                language_id: self.meta.language_id.clone(),
                source_document_id: self.meta.document_id.clone(),
            };
            match service.upsert_sentence(request).await {
                Ok(record) => {
                    self.index.mark_sentence_clean(key, &record.id);
                    self.write_back_id(key, &record.id);
                    report.upserted += 1;
                }
                Err(error) => {
                    tracing::warn!(%key, %error, "sentence upsert failed");
                    report.failed.push(ReconcileFailure {
                        entity: EntityKind::Sentence,
                        key,
                        error,
                    });
                }
            }
        }

        self.reconcile_deletes(service, &mut report).await;
        report
    }

    async fn reconcile_deletes(
        &mut self,
        service: &dyn PersistenceService,
        report: &mut ReconcileReport,
    ) {
        // Entities removed locally before they were ever persisted need no
        // remote call; they just leave the index.
        let (gp_unsaved, gp_pending): (Vec<_>, Vec<_>) = self
            .index
            .grammar_points
            .iter()
            .filter(|(_, e)| e.deleted)
            .map(|(&k, e)| (k, e.snapshot.database_id.clone()))
            .partition(|(_, id)| id.is_none());
        self.index
            .drop_deleted_grammar_points(&gp_unsaved.iter().map(|(k, _)| *k).collect::<Vec<_>>());

        if !gp_pending.is_empty() {
            let keys: Vec<NodeKey> = gp_pending.iter().map(|(k, _)| *k).collect();
            let ids: Vec<String> = gp_pending.into_iter().filter_map(|(_, id)| id).collect();
            match service.delete_grammar_points(ids).await {
                Ok(()) => {
                    report.deleted += keys.len();
                    self.index.drop_deleted_grammar_points(&keys);
                }
                Err(error) => {
                    tracing::warn!(%error, "grammar point delete failed");
                    report.failed.extend(keys.into_iter().map(|key| ReconcileFailure {
                        entity: EntityKind::GrammarPoint,
                        key,
                        error: error.clone(),
                    }));
                }
            }
        }

        let (s_unsaved, s_pending): (Vec<_>, Vec<_>) = self
            .index
            .sentences
            .iter()
            .filter(|(_, e)| e.deleted)
            .map(|(&k, e)| (k, e.snapshot.database_id.clone()))
            .partition(|(_, id)| id.is_none());
        self.index
            .drop_deleted_sentences(&s_unsaved.iter().map(|(k, _)| *k).collect::<Vec<_>>());

        if !s_pending.is_empty() {
            let keys: Vec<NodeKey> = s_pending.iter().map(|(k, _)| *k).collect();
            let ids: Vec<String> = s_pending.into_iter().filter_map(|(_, id)| id).collect();
            match service.delete_sentences(ids).await {
                Ok(()) => {
                    report.deleted += keys.len();
                    self.index.drop_deleted_sentences(&keys);
                }
                Err(error) => {
                    tracing::warn!(%error, "sentence delete failed");
                    report.failed.extend(keys.into_iter().map(|key| ReconcileFailure {
                        entity: EntityKind::Sentence,
                        key,
                        error: error.clone(),
                    }));
                }
            }
        }

        let (w_unsaved, w_pending): (Vec<_>, Vec<_>) = self
            .index
            .words
            .iter()
            .filter(|(_, e)| e.deleted)
            .map(|(&k, e)| (k, e.snapshot.database_id.clone()))
            .partition(|(_, id)| id.is_none());
        self.index
            .drop_deleted_words(&w_unsaved.iter().map(|(k, _)| *k).collect::<Vec<_>>());

        if !w_pending.is_empty() {
            let keys: Vec<NodeKey> = w_pending.iter().map(|(k, _)| *k).collect();
            let ids: Vec<String> = w_pending.into_iter().filter_map(|(_, id)| id).collect();
            match service.delete_words(ids).await {
                Ok(()) => {
                    report.deleted += keys.len();
                    self.index.drop_deleted_words(&keys);
                }
                Err(error) => {
                    tracing::warn!(%error, "word delete failed");
                    report.failed.extend(keys.into_iter().map(|key| ReconcileFailure {
                        entity: EntityKind::Word,
                        key,
                        error: error.clone(),
                    }));
                }
            }
        }
    }

    /// Write a returned persisted id back onto the live node, through the
    /// normal command path so the editor's change tracking stays coherent.
    /// The node may legitimately be gone already.
    fn write_back_id(&mut self, key: NodeKey, id: &str) {
        if !self.editor.tree().contains(key) {
            return;
        }
        if let Err(error) = self.apply(&Command::AttachDatabaseId {
            key,
            id: id.to_string(),
        }) {
            tracing::warn!(%key, %error, "persisted id write-back failed");
        }
    }
}
