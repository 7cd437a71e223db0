//! # Document Session
//!
//! One open document: the editor state, the outline index, and the editing
//! settings, with an explicit lifecycle. Nothing here is global; two
//! sessions never share state, and teardown leaves no residue.
//!
//! After every committed transaction the session diffs the tree's tracked
//! nodes against the previous extraction and feeds created/updated/destroyed
//! events to the index. Same observable behavior as engine mutation
//! listeners, with no callback ordering to reason about.

use glossa_document::deserialize_str;
use glossa_editor::{Command, Editor, EditorSettings, Outcome, Selection};

use crate::error::SyncError;
use crate::outline::{extract_snapshots, OutlineIndex, TrackedSnapshots};

/// Identity of the document being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub document_id: String,
    pub language_id: String,
    pub title: String,
}

/// Owner of all per-document editing state.
pub struct DocumentSession {
    pub(crate) meta: DocumentMeta,
    pub(crate) editor: Editor,
    pub(crate) settings: EditorSettings,
    pub(crate) index: OutlineIndex,
    last: TrackedSnapshots,
    pub(crate) reconciling: bool,
}

impl DocumentSession {
    /// Open a fresh, empty document.
    pub fn new(meta: DocumentMeta) -> Self {
        let editor = Editor::new();
        let last = extract_snapshots(editor.tree());
        Self {
            meta,
            editor,
            settings: EditorSettings::default(),
            index: OutlineIndex::new(),
            last,
            reconciling: false,
        }
    }

    /// Open a persisted document. Everything tracked starts clean, since it
    /// all just came from the store.
    pub fn load(meta: DocumentMeta, serialized: &str) -> Result<Self, SyncError> {
        let tree = deserialize_str(serialized)?;
        let editor = Editor::from_tree(tree);
        let snapshots = extract_snapshots(editor.tree());
        let mut index = OutlineIndex::new();
        index.load_baseline(&snapshots);
        Ok(Self {
            meta,
            editor,
            settings: EditorSettings::default(),
            index,
            last: snapshots,
            reconciling: false,
        })
    }

    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.meta.title = title.into();
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn index(&self) -> &OutlineIndex {
        &self.index
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn set_mark_all_occurrences(&mut self, enabled: bool) {
        self.settings.mark_all_occurrences = enabled;
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.editor.set_selection(selection);
    }

    /// Run one command and, if it handled the dispatch, update the outline
    /// index from the committed tree.
    pub fn apply(&mut self, command: &Command) -> Result<Outcome, SyncError> {
        let outcome = self.editor.apply(command, &self.settings)?;
        if outcome == Outcome::Handled {
            self.commit_diff();
        }
        Ok(outcome)
    }

    /// Close the document: wipe the index and the snapshot baseline.
    pub fn teardown(&mut self) {
        self.index.clear();
        self.last = TrackedSnapshots::default();
    }

    /// Diff the tree's tracked nodes against the previous extraction and
    /// update the index.
    fn commit_diff(&mut self) {
        let current = extract_snapshots(self.editor.tree());

        for (&key, snapshot) in &current.words {
            match self.last.words.get(&key) {
                None => self.index.word_created(key, snapshot.clone()),
                Some(previous) if previous != snapshot => {
                    self.index.word_updated(key, snapshot.clone())
                }
                Some(_) => {}
            }
        }
        for &key in self.last.words.keys() {
            if !current.words.contains_key(&key) {
                self.index.word_destroyed(key);
            }
        }

        for (&key, snapshot) in &current.sentences {
            match self.last.sentences.get(&key) {
                None => self.index.sentence_created(key, snapshot.clone()),
                Some(previous) if previous != snapshot => {
                    self.index.sentence_updated(key, snapshot.clone())
                }
                Some(_) => {}
            }
        }
        for &key in self.last.sentences.keys() {
            if !current.sentences.contains_key(&key) {
                self.index.sentence_destroyed(key);
            }
        }

        for (&key, snapshot) in &current.grammar_points {
            match self.last.grammar_points.get(&key) {
                None => self.index.grammar_point_created(key, snapshot.clone()),
                Some(previous) if previous != snapshot => {
                    self.index.grammar_point_updated(key, snapshot.clone())
                }
                Some(_) => {}
            }
        }
        for &key in self.last.grammar_points.keys() {
            if !current.grammar_points.contains_key(&key) {
                self.index.grammar_point_destroyed(key);
            }
        }

        self.last = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_document::{serialize_string, DocumentTree, Node};
    use glossa_editor::Point;

    fn meta() -> DocumentMeta {
        DocumentMeta {
            document_id: "d1".to_string(),
            language_id: "es".to_string(),
            title: "práctica".to_string(),
        }
    }

    fn session_with_text(line: &str) -> (DocumentSession, glossa_document::NodeKey) {
        let mut session = DocumentSession::new(meta());
        let p = session.editor().tree().first_child(session.editor().tree().root()).unwrap();
        // Seed the paragraph through a command so the index sees the edit.
        let mut tree = session.editor.tree().clone();
        let t = tree.create(Node::Text {
            text: line.to_string(),
        });
        tree.append_child(p, t).unwrap();
        session.editor = Editor::from_tree(tree);
        (session, t)
    }

    #[test]
    fn test_inserting_word_marks_index_dirty() {
        let (mut session, run) = session_with_text("hola mundo");
        session.set_selection(Some(Selection::Range {
            anchor: Point::new(run, 0),
            focus: Point::new(run, 4),
        }));

        session
            .apply(&Command::InsertWord {
                word: "hola".to_string(),
                translations: vec!["hello".to_string()],
                database_id: None,
                target: None,
            })
            .unwrap();

        assert_eq!(session.index().dirty_count(), 1);
    }

    #[test]
    fn test_identical_translation_update_stays_clean() {
        let (mut session, run) = session_with_text("hola mundo");
        session.set_selection(Some(Selection::Range {
            anchor: Point::new(run, 0),
            focus: Point::new(run, 10),
        }));
        session.apply(&Command::ToggleSentence).unwrap();
        let sentence = session
            .editor()
            .tree()
            .keys_of_kind(glossa_document::NodeKind::Sentence)[0];
        session
            .apply(&Command::SetSentenceTranslation {
                key: sentence,
                translation: "hello world".to_string(),
            })
            .unwrap();
        let dirty_before = session.index().dirty_count();

        // Re-setting the same translation is a cosmetic no-op.
        session
            .apply(&Command::SetSentenceTranslation {
                key: sentence,
                translation: "hello world".to_string(),
            })
            .unwrap();
        assert_eq!(session.index().dirty_count(), dirty_before);
    }

    #[test]
    fn test_loaded_document_starts_clean() {
        let mut tree = DocumentTree::new();
        let p = tree.first_child(tree.root()).unwrap();
        let word = tree.create(Node::Word {
            word: "casa".to_string(),
            translations: vec!["house".to_string()],
            database_id: Some("w1".to_string()),
            auto_fill: false,
        });
        tree.append_child(p, word).unwrap();
        let raw = serialize_string(&tree);

        let session = DocumentSession::load(meta(), &raw).unwrap();
        assert!(session.index().is_fully_clean());
        assert_eq!(session.index().words.len(), 1);
    }

    #[test]
    fn test_destroying_word_marks_deleted() {
        let mut tree = DocumentTree::new();
        let p = tree.first_child(tree.root()).unwrap();
        let word = tree.create(Node::Word {
            word: "casa".to_string(),
            translations: vec![],
            database_id: Some("w1".to_string()),
            auto_fill: false,
        });
        tree.append_child(p, word).unwrap();
        let raw = serialize_string(&tree);
        let mut session = DocumentSession::load(meta(), &raw).unwrap();

        let word = session
            .editor()
            .tree()
            .keys_of_kind(glossa_document::NodeKind::Word)[0];
        session.set_selection(Some(Selection::Node(word)));
        session.apply(&Command::Backspace).unwrap();

        assert_eq!(session.index().deleted_count(), 1);
    }

    #[test]
    fn test_teardown_wipes_index() {
        let (mut session, run) = session_with_text("hola");
        session.set_selection(Some(Selection::Range {
            anchor: Point::new(run, 0),
            focus: Point::new(run, 4),
        }));
        session
            .apply(&Command::InsertWord {
                word: "hola".to_string(),
                translations: vec![],
                database_id: None,
                target: None,
            })
            .unwrap();
        assert_eq!(session.index().dirty_count(), 1);

        session.teardown();
        assert!(session.index().is_fully_clean());
    }
}
