//! # Editor
//!
//! The single owner of the mutable document tree. Commands run inside
//! discrete transactions: the handler mutates, the structural transform
//! sweep re-normalizes, the version bumps. Listeners of any kind never see a
//! half-repaired tree.

use glossa_document::{deserialize_document, DocumentTree};
use serde_json::Value;

use crate::commands::{Command, Outcome};
use crate::errors::EditorError;
use crate::selection::Selection;
use crate::transforms;

/// Per-session editing settings, owned by the caller and passed into each
/// transaction rather than held globally.
#[derive(Debug, Clone, Default)]
pub struct EditorSettings {
    /// When inserting a word, also wrap every other case-insensitive
    /// occurrence of its surface text in an auto-fill word.
    pub mark_all_occurrences: bool,
}

/// Editable document state.
#[derive(Debug, Clone)]
pub struct Editor {
    pub(crate) tree: DocumentTree,
    pub(crate) selection: Option<Selection>,
    version: u64,
}

impl Editor {
    /// A fresh editor over an empty document.
    pub fn new() -> Self {
        Self::from_tree(DocumentTree::new())
    }

    /// Wrap an existing tree, normalizing it first.
    pub fn from_tree(mut tree: DocumentTree) -> Self {
        transforms::run(&mut tree);
        Self {
            tree,
            selection: None,
            version: 0,
        }
    }

    /// Load a serialized document. Malformed parts degrade rather than
    /// failing the load.
    pub fn load(value: &Value) -> Self {
        Self::from_tree(deserialize_document(value))
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Transactions committed so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Run one command as a transaction. On `Handled`, the structural
    /// transforms re-normalize the tree and the version increments; on
    /// `NotHandled` nothing changed and the engine may fall through to its
    /// default behavior.
    pub fn apply(
        &mut self,
        command: &Command,
        settings: &EditorSettings,
    ) -> Result<Outcome, EditorError> {
        let outcome = command.run(self, settings)?;
        if outcome == Outcome::Handled {
            transforms::run(&mut self.tree);
            // Repairs may have dropped the node the selection pointed at.
            if let Some(selection) = &self.selection {
                if !selection.is_valid(&self.tree) {
                    self.selection = None;
                }
            }
            self.version += 1;
        }
        Ok(outcome)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_document::{Node, NodeKind};

    #[test]
    fn test_not_handled_does_not_bump_version() {
        let mut editor = Editor::new();
        let settings = EditorSettings::default();

        // No selection: nothing to wrap.
        let outcome = editor.apply(&Command::ToggleSentence, &settings).unwrap();
        assert_eq!(outcome, Outcome::NotHandled);
        assert_eq!(editor.version(), 0);
    }

    #[test]
    fn test_handled_command_normalizes_and_bumps_version() {
        let mut editor = Editor::new();
        let settings = EditorSettings::default();
        let p = editor.tree().first_child(editor.tree().root()).unwrap();
        editor.set_selection(Some(Selection::caret(p, 0)));

        let outcome = editor
            .apply(
                &Command::InsertImage {
                    src: "cat.png".to_string(),
                    alt: String::new(),
                },
                &settings,
            )
            .unwrap();
        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(editor.version(), 1);

        // Transform padding kicked in: the image is followed by a paragraph.
        let root = editor.tree().root();
        let last = editor.tree().last_child(root).unwrap();
        assert_eq!(editor.tree().kind(last), Some(NodeKind::Paragraph));
    }

    #[test]
    fn test_selection_cleared_when_target_vanishes() {
        let mut editor = Editor::new();
        let settings = EditorSettings::default();
        let p = editor.tree().first_child(editor.tree().root()).unwrap();

        let word = editor.tree.create(Node::Word {
            word: "casa".to_string(),
            translations: vec![],
            database_id: None,
            auto_fill: false,
        });
        editor.tree.append_child(p, word).unwrap();

        // A lone toggle will be deleted by the transforms; a selection on it
        // must not survive the transaction.
        let toggle = editor.tree.create(Node::SentenceToggle);
        editor.tree.append_child(p, toggle).unwrap();
        editor.set_selection(Some(Selection::Node(toggle)));

        editor
            .apply(
                &Command::AttachDatabaseId {
                    key: word,
                    id: "w1".to_string(),
                },
                &settings,
            )
            .unwrap();
        assert_eq!(editor.selection(), None);
        assert!(!editor.tree().contains(toggle));
    }
}
