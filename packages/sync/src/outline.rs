//! # Outline Index
//!
//! Derived index of every tracked annotation (word, sentence, grammar
//! point) currently in the tree, keyed by node identity and tagged with
//! dirty/deleted flags. The reconciler reads it to compute the minimal set
//! of remote writes.
//!
//! Entries move through `absent → clean → dirty → (clean | deleted) →
//! absent`. A snapshot-equal update never sets the dirty flag, so cosmetic
//! re-renders cost no network writes.

use std::collections::HashMap;

use glossa_document::{DocumentTree, Node, NodeKey, NodeKind};

/// Persisted-relevant fields of a word node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSnapshot {
    pub word: String,
    pub translations: Vec<String>,
    pub database_id: Option<String>,
    pub auto_fill: bool,
}

/// Persisted-relevant fields of a sentence node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSnapshot {
    /// Concatenated surface text of the sentence content.
    pub text: String,
    pub translation: String,
    pub database_id: Option<String>,
    /// Persisted ids of the words contained in the sentence. Compared as a
    /// set; order carries no meaning.
    pub word_ids: Vec<String>,
}

impl SentenceSnapshot {
    /// Field-wise equality with set semantics for the contained words.
    pub fn comparable_eq(&self, other: &Self) -> bool {
        if self.text != other.text
            || self.translation != other.translation
            || self.database_id != other.database_id
        {
            return false;
        }
        let mut a = self.word_ids.clone();
        let mut b = other.word_ids.clone();
        a.sort();
        b.sort();
        a == b
    }
}

/// Persisted-relevant fields of a grammar point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarPointSnapshot {
    pub title: String,
    pub database_id: Option<String>,
}

/// Everything trackable extracted from a tree in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedSnapshots {
    pub words: HashMap<NodeKey, WordSnapshot>,
    pub sentences: HashMap<NodeKey, SentenceSnapshot>,
    pub grammar_points: HashMap<NodeKey, GrammarPointSnapshot>,
}

/// Extract the current tracked-node snapshots from a tree.
pub fn extract_snapshots(tree: &DocumentTree) -> TrackedSnapshots {
    let mut out = TrackedSnapshots::default();

    for key in tree.walk() {
        match tree.node(key) {
            Some(Node::Word {
                word,
                translations,
                database_id,
                auto_fill,
            }) => {
                out.words.insert(
                    key,
                    WordSnapshot {
                        word: word.clone(),
                        translations: translations.clone(),
                        database_id: database_id.clone(),
                        auto_fill: *auto_fill,
                    },
                );
            }
            Some(Node::Sentence {
                translation,
                database_id,
                ..
            }) => {
                let word_ids = tree
                    .descendants(key)
                    .into_iter()
                    .filter_map(|k| match tree.node(k) {
                        Some(Node::Word { database_id, .. }) => database_id.clone(),
                        _ => None,
                    })
                    .collect();
                out.sentences.insert(
                    key,
                    SentenceSnapshot {
                        text: tree.text_content(key),
                        translation: translation.clone(),
                        database_id: database_id.clone(),
                        word_ids,
                    },
                );
            }
            Some(Node::GrammarPointContainer { database_id, .. }) => {
                let title = tree
                    .children(key)
                    .iter()
                    .find(|&&c| tree.kind(c) == Some(NodeKind::GrammarPointTitle))
                    .map(|&c| tree.text_content(c))
                    .unwrap_or_default();
                out.grammar_points.insert(
                    key,
                    GrammarPointSnapshot {
                        title,
                        database_id: database_id.clone(),
                    },
                );
            }
            _ => {}
        }
    }
    out
}

/// One tracked entity with its sync state.
#[derive(Debug, Clone)]
pub struct Entry<S> {
    pub snapshot: S,
    pub dirty: bool,
    pub deleted: bool,
}

impl<S> Entry<S> {
    fn new(snapshot: S, dirty: bool) -> Self {
        Self {
            snapshot,
            dirty,
            deleted: false,
        }
    }

    /// Needs a remote upsert.
    pub fn needs_upsert(&self) -> bool {
        self.dirty && !self.deleted
    }
}

/// Index of tracked entities for one document session.
#[derive(Debug, Clone, Default)]
pub struct OutlineIndex {
    pub(crate) words: HashMap<NodeKey, Entry<WordSnapshot>>,
    pub(crate) sentences: HashMap<NodeKey, Entry<SentenceSnapshot>>,
    pub(crate) grammar_points: HashMap<NodeKey, Entry<GrammarPointSnapshot>>,
}

impl OutlineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline after a fresh document load: every entity clean.
    pub fn load_baseline(&mut self, snapshots: &TrackedSnapshots) {
        self.words = snapshots
            .words
            .iter()
            .map(|(&k, s)| (k, Entry::new(s.clone(), false)))
            .collect();
        self.sentences = snapshots
            .sentences
            .iter()
            .map(|(&k, s)| (k, Entry::new(s.clone(), false)))
            .collect();
        self.grammar_points = snapshots
            .grammar_points
            .iter()
            .map(|(&k, s)| (k, Entry::new(s.clone(), false)))
            .collect();
        tracing::debug!(
            words = self.words.len(),
            sentences = self.sentences.len(),
            grammar_points = self.grammar_points.len(),
            "outline baseline loaded"
        );
    }

    /// Wipe the index (document cleared / session teardown).
    pub fn clear(&mut self) {
        self.words.clear();
        self.sentences.clear();
        self.grammar_points.clear();
    }

    pub fn word_created(&mut self, key: NodeKey, snapshot: WordSnapshot) {
        let clean = Self::matches_clean_persisted(&self.words, &snapshot, |a, b| a == b)
            && snapshot.database_id.is_some();
        self.words.insert(key, Entry::new(snapshot, !clean));
    }

    pub fn word_updated(&mut self, key: NodeKey, snapshot: WordSnapshot) {
        Self::on_updated(&mut self.words, key, snapshot, |a, b| a == b);
    }

    pub fn word_destroyed(&mut self, key: NodeKey) {
        Self::on_destroyed(&mut self.words, key);
    }

    pub fn sentence_created(&mut self, key: NodeKey, snapshot: SentenceSnapshot) {
        let clean = Self::matches_clean_persisted(&self.sentences, &snapshot, |a, b| {
            a.comparable_eq(b)
        }) && snapshot.database_id.is_some();
        self.sentences.insert(key, Entry::new(snapshot, !clean));
    }

    pub fn sentence_updated(&mut self, key: NodeKey, snapshot: SentenceSnapshot) {
        Self::on_updated(&mut self.sentences, key, snapshot, |a, b| a.comparable_eq(b));
    }

    pub fn sentence_destroyed(&mut self, key: NodeKey) {
        Self::on_destroyed(&mut self.sentences, key);
    }

    pub fn grammar_point_created(&mut self, key: NodeKey, snapshot: GrammarPointSnapshot) {
        let clean = Self::matches_clean_persisted(&self.grammar_points, &snapshot, |a, b| a == b)
            && snapshot.database_id.is_some();
        self.grammar_points.insert(key, Entry::new(snapshot, !clean));
    }

    pub fn grammar_point_updated(&mut self, key: NodeKey, snapshot: GrammarPointSnapshot) {
        Self::on_updated(&mut self.grammar_points, key, snapshot, |a, b| a == b);
    }

    pub fn grammar_point_destroyed(&mut self, key: NodeKey) {
        Self::on_destroyed(&mut self.grammar_points, key);
    }

    /// Whether a clean, non-deleted entry with the same persisted id and
    /// identical comparable fields already exists (re-creation after a
    /// reload path).
    fn matches_clean_persisted<S>(
        map: &HashMap<NodeKey, Entry<S>>,
        snapshot: &S,
        same: impl Fn(&S, &S) -> bool,
    ) -> bool {
        map.values()
            .any(|e| !e.dirty && !e.deleted && same(&e.snapshot, snapshot))
    }

    fn on_updated<S>(
        map: &mut HashMap<NodeKey, Entry<S>>,
        key: NodeKey,
        snapshot: S,
        same: impl Fn(&S, &S) -> bool,
    ) {
        match map.get_mut(&key) {
            Some(entry) => {
                if entry.deleted {
                    // A resurrected node: back to a live, dirty entry.
                    entry.deleted = false;
                    entry.dirty = true;
                    entry.snapshot = snapshot;
                } else if !same(&entry.snapshot, &snapshot) {
                    entry.snapshot = snapshot;
                    entry.dirty = true;
                }
                // Identical snapshot: no state change.
            }
            None => {
                map.insert(key, Entry::new(snapshot, true));
            }
        }
    }

    fn on_destroyed<S>(map: &mut HashMap<NodeKey, Entry<S>>, key: NodeKey) {
        if let Some(entry) = map.get_mut(&key) {
            // Keep the snapshot so the persisted id is still known for the
            // remote delete.
            entry.deleted = true;
        }
    }

    /// Mark one entry clean after a successful upsert, recording the
    /// persisted id the service returned.
    pub fn mark_word_clean(&mut self, key: NodeKey, id: &str) {
        if let Some(entry) = self.words.get_mut(&key) {
            entry.snapshot.database_id = Some(id.to_string());
            entry.dirty = false;
        }
    }

    pub fn mark_sentence_clean(&mut self, key: NodeKey, id: &str) {
        if let Some(entry) = self.sentences.get_mut(&key) {
            entry.snapshot.database_id = Some(id.to_string());
            entry.dirty = false;
        }
    }

    pub fn mark_grammar_point_clean(&mut self, key: NodeKey, id: &str) {
        if let Some(entry) = self.grammar_points.get_mut(&key) {
            entry.snapshot.database_id = Some(id.to_string());
            entry.dirty = false;
        }
    }

    /// Drop entries whose remote deletion completed (or that were never
    /// persisted at all).
    pub fn drop_deleted_words(&mut self, keys: &[NodeKey]) {
        for key in keys {
            self.words.remove(key);
        }
    }

    pub fn drop_deleted_sentences(&mut self, keys: &[NodeKey]) {
        for key in keys {
            self.sentences.remove(key);
        }
    }

    pub fn drop_deleted_grammar_points(&mut self, keys: &[NodeKey]) {
        for key in keys {
            self.grammar_points.remove(key);
        }
    }

    pub fn dirty_count(&self) -> usize {
        self.words.values().filter(|e| e.needs_upsert()).count()
            + self.sentences.values().filter(|e| e.needs_upsert()).count()
            + self
                .grammar_points
                .values()
                .filter(|e| e.needs_upsert())
                .count()
    }

    pub fn deleted_count(&self) -> usize {
        self.words.values().filter(|e| e.deleted).count()
            + self.sentences.values().filter(|e| e.deleted).count()
            + self.grammar_points.values().filter(|e| e.deleted).count()
    }

    pub fn is_fully_clean(&self) -> bool {
        self.dirty_count() == 0 && self.deleted_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_document::Node;

    fn key_gen() -> impl FnMut() -> NodeKey {
        // Keys for index-only tests come from a scratch tree.
        let mut tree = DocumentTree::new();
        move || tree.create(Node::Paragraph)
    }

    fn sentence_snapshot(ids: &[&str]) -> SentenceSnapshot {
        SentenceSnapshot {
            text: "vivo aquí".to_string(),
            translation: "I live here".to_string(),
            database_id: Some("s1".to_string()),
            word_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_created_entry_is_dirty() {
        let mut keys = key_gen();
        let mut index = OutlineIndex::new();
        index.word_created(
            keys(),
            WordSnapshot {
                word: "casa".to_string(),
                translations: vec!["house".to_string()],
                database_id: None,
                auto_fill: false,
            },
        );
        assert_eq!(index.dirty_count(), 1);
    }

    #[test]
    fn test_recreation_of_clean_persisted_entry_stays_clean() {
        let mut keys = key_gen();
        let mut index = OutlineIndex::new();
        let snapshot = GrammarPointSnapshot {
            title: "ser vs estar".to_string(),
            database_id: Some("g1".to_string()),
        };

        let mut baseline = TrackedSnapshots::default();
        baseline.grammar_points.insert(keys(), snapshot.clone());
        index.load_baseline(&baseline);

        // The same persisted entity re-registers under a fresh key, as
        // happens when a document is re-materialized.
        index.grammar_point_created(keys(), snapshot);
        assert_eq!(index.dirty_count(), 0);
    }

    #[test]
    fn test_identical_update_is_suppressed() {
        let mut keys = key_gen();
        let key = keys();
        let mut index = OutlineIndex::new();
        let mut baseline = TrackedSnapshots::default();
        baseline.sentences.insert(key, sentence_snapshot(&["w1", "w2"]));
        index.load_baseline(&baseline);

        // Same fields, word ids in a different order: still clean.
        index.sentence_updated(key, sentence_snapshot(&["w2", "w1"]));
        assert_eq!(index.dirty_count(), 0);

        // An actual change marks it dirty.
        let mut changed = sentence_snapshot(&["w2", "w1"]);
        changed.translation = "I live HERE".to_string();
        index.sentence_updated(key, changed);
        assert_eq!(index.dirty_count(), 1);
    }

    #[test]
    fn test_destroyed_entry_keeps_snapshot_for_remote_delete() {
        let mut keys = key_gen();
        let key = keys();
        let mut index = OutlineIndex::new();
        let mut baseline = TrackedSnapshots::default();
        baseline.sentences.insert(key, sentence_snapshot(&[]));
        index.load_baseline(&baseline);

        index.sentence_destroyed(key);
        assert_eq!(index.deleted_count(), 1);
        let entry = index.sentences.get(&key).unwrap();
        assert_eq!(entry.snapshot.database_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_update_of_unknown_key_registers_dirty() {
        let mut keys = key_gen();
        let mut index = OutlineIndex::new();
        index.word_updated(
            keys(),
            WordSnapshot {
                word: "perro".to_string(),
                translations: vec![],
                database_id: None,
                auto_fill: false,
            },
        );
        assert_eq!(index.dirty_count(), 1);
    }

    #[test]
    fn test_clear_wipes_everything() {
        let mut keys = key_gen();
        let mut index = OutlineIndex::new();
        index.word_created(
            keys(),
            WordSnapshot {
                word: "casa".to_string(),
                translations: vec![],
                database_id: None,
                auto_fill: false,
            },
        );
        index.clear();
        assert!(index.is_fully_clean());
        assert!(index.words.is_empty());
    }

    #[test]
    fn test_extract_snapshots_collects_word_ids() {
        let mut tree = DocumentTree::new();
        let p = tree.first_child(tree.root()).unwrap();
        let sentence = tree.create(Node::Sentence {
            translation: "hi".to_string(),
            database_id: Some("s1".to_string()),
            show_translation: false,
        });
        tree.append_child(p, sentence).unwrap();
        let word = tree.create(Node::Word {
            word: "hola".to_string(),
            translations: vec![],
            database_id: Some("w1".to_string()),
            auto_fill: false,
        });
        tree.append_child(sentence, word).unwrap();
        let unsaved = tree.create(Node::Word {
            word: "mundo".to_string(),
            translations: vec![],
            database_id: None,
            auto_fill: false,
        });
        tree.append_child(sentence, unsaved).unwrap();
        let toggle = tree.create(Node::SentenceToggle);
        tree.append_child(sentence, toggle).unwrap();

        let snapshots = extract_snapshots(&tree);
        assert_eq!(snapshots.words.len(), 2);
        let s = snapshots.sentences.get(&sentence).unwrap();
        assert_eq!(s.text, "holamundo");
        // Only persisted words contribute ids.
        assert_eq!(s.word_ids, vec!["w1".to_string()]);
    }
}
