//! # Node Variants
//!
//! The closed set of node types a glossa document is built from, with the
//! structural predicates the editing layer consults when deciding whether a
//! merge, split, or text insertion is legal.
//!
//! Predicates are pure functions of the variant tag, never of node state,
//! so the same node answers the same way for its whole lifetime.

use serde_json::Value;

/// Type tag for a node, independent of its field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Paragraph,
    Text,
    Word,
    Sentence,
    SentenceToggle,
    GrammarPointContainer,
    GrammarPointTitle,
    GrammarPointContent,
    DialogueContainer,
    DialogueSpeaker,
    DialogueSpeech,
    SplitLayoutContainer,
    SplitLayoutColumn,
    Image,
    Remark,
    Unknown,
}

impl NodeKind {
    /// Wire name used in serialized documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Text => "text",
            NodeKind::Word => "word",
            NodeKind::Sentence => "sentence",
            NodeKind::SentenceToggle => "sentence-toggle",
            NodeKind::GrammarPointContainer => "grammar-point-container",
            NodeKind::GrammarPointTitle => "grammar-point-title",
            NodeKind::GrammarPointContent => "grammar-point-content",
            NodeKind::DialogueContainer => "dialogue-container",
            NodeKind::DialogueSpeaker => "dialogue-speaker",
            NodeKind::DialogueSpeech => "dialogue-speech",
            NodeKind::SplitLayoutContainer => "split-layout-container",
            NodeKind::SplitLayoutColumn => "split-layout-column",
            NodeKind::Image => "image",
            NodeKind::Remark => "remark",
            NodeKind::Unknown => "unknown",
        }
    }

    /// Inverse of [`type_name`](Self::type_name). Unrecognized names map to
    /// `None` so callers can fall back to an opaque placeholder.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            "root" => NodeKind::Root,
            "paragraph" => NodeKind::Paragraph,
            "text" => NodeKind::Text,
            "word" => NodeKind::Word,
            "sentence" => NodeKind::Sentence,
            "sentence-toggle" => NodeKind::SentenceToggle,
            "grammar-point-container" => NodeKind::GrammarPointContainer,
            "grammar-point-title" => NodeKind::GrammarPointTitle,
            "grammar-point-content" => NodeKind::GrammarPointContent,
            "dialogue-container" => NodeKind::DialogueContainer,
            "dialogue-speaker" => NodeKind::DialogueSpeaker,
            "dialogue-speech" => NodeKind::DialogueSpeech,
            "split-layout-container" => NodeKind::SplitLayoutContainer,
            "split-layout-column" => NodeKind::SplitLayoutColumn,
            "image" => NodeKind::Image,
            "remark" => NodeKind::Remark,
            _ => return None,
        })
    }
}

/// A document node. Children live in the tree arena, not in the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Document root. Exactly one per tree.
    Root,

    /// Plain block paragraph.
    Paragraph,

    /// Plain text run.
    Text { text: String },

    /// A marked vocabulary occurrence linked to the personal dictionary.
    ///
    /// `auto_fill` is true when the node was produced by the
    /// mark-all-occurrences bulk insert rather than a direct user action.
    Word {
        word: String,
        translations: Vec<String>,
        database_id: Option<String>,
        auto_fill: bool,
    },

    /// Groups a run of inline content as one translatable unit.
    Sentence {
        translation: String,
        database_id: Option<String>,
        show_translation: bool,
    },

    /// UI affordance revealing a sentence translation. Required trailing
    /// child of every Sentence, never meaningful anywhere else.
    SentenceToggle,

    /// Collapsible grammar annotation. Owns exactly [Title, Content].
    GrammarPointContainer {
        database_id: Option<String>,
        open: bool,
    },

    /// First child of a grammar point: plain-text heading.
    GrammarPointTitle,

    /// Second child of a grammar point: arbitrary block children. Acts as a
    /// shadow sub-root for child normalization.
    GrammarPointContent,

    /// Container of repeated (Speaker, Speech) pairs.
    DialogueContainer,

    /// Who is speaking a dialogue line.
    DialogueSpeaker,

    /// What is spoken in a dialogue line.
    DialogueSpeech,

    /// Two-column layout. Owns exactly two columns.
    SplitLayoutContainer,

    /// One column of a split layout. Never empty.
    SplitLayoutColumn,

    /// Embedded image reference. Lives directly under the nearest root.
    Image { src: String, alt: String },

    /// Freestanding margin remark.
    Remark { text: String },

    /// Placeholder for a serialized node type this build does not know.
    /// Carries the raw JSON so a later save emits it back unchanged.
    Unknown { raw: Value },
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Root => NodeKind::Root,
            Node::Paragraph => NodeKind::Paragraph,
            Node::Text { .. } => NodeKind::Text,
            Node::Word { .. } => NodeKind::Word,
            Node::Sentence { .. } => NodeKind::Sentence,
            Node::SentenceToggle => NodeKind::SentenceToggle,
            Node::GrammarPointContainer { .. } => NodeKind::GrammarPointContainer,
            Node::GrammarPointTitle => NodeKind::GrammarPointTitle,
            Node::GrammarPointContent => NodeKind::GrammarPointContent,
            Node::DialogueContainer => NodeKind::DialogueContainer,
            Node::DialogueSpeaker => NodeKind::DialogueSpeaker,
            Node::DialogueSpeech => NodeKind::DialogueSpeech,
            Node::SplitLayoutContainer => NodeKind::SplitLayoutContainer,
            Node::SplitLayoutColumn => NodeKind::SplitLayoutColumn,
            Node::Image { .. } => NodeKind::Image,
            Node::Remark { .. } => NodeKind::Remark,
            Node::Unknown { .. } => NodeKind::Unknown,
        }
    }

    /// Whether this variant may hold children at all.
    pub fn is_container(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::Root
                | NodeKind::Paragraph
                | NodeKind::Sentence
                | NodeKind::GrammarPointContainer
                | NodeKind::GrammarPointTitle
                | NodeKind::GrammarPointContent
                | NodeKind::DialogueContainer
                | NodeKind::DialogueSpeaker
                | NodeKind::DialogueSpeech
                | NodeKind::SplitLayoutContainer
                | NodeKind::SplitLayoutColumn
        )
    }

    /// Inline nodes flow within a paragraph-like line; everything else is
    /// block-level.
    pub fn is_inline(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::Text
                | NodeKind::Word
                | NodeKind::Sentence
                | NodeKind::SentenceToggle
                | NodeKind::DialogueSpeaker
                | NodeKind::DialogueSpeech
        )
    }

    /// Atomic decorators are selected and deleted as a unit; the caret never
    /// enters them.
    pub fn is_atomic(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::Word | NodeKind::SentenceToggle | NodeKind::Image | NodeKind::Unknown
        )
    }

    /// Whether an empty instance of this container is legal after
    /// normalization.
    pub fn can_be_empty(&self) -> bool {
        match self.kind() {
            NodeKind::SplitLayoutColumn | NodeKind::Sentence => false,
            _ => true,
        }
    }

    /// Whether the generic merge operation may join `self` with a following
    /// sibling `other`.
    pub fn can_merge_with(&self, other: &Node) -> bool {
        if self.is_atomic() || other.is_atomic() {
            return false;
        }
        self.kind() == other.kind()
            && matches!(
                self.kind(),
                NodeKind::Paragraph | NodeKind::Text | NodeKind::Sentence
            )
    }

    pub fn can_insert_text_before(&self) -> bool {
        !self.is_atomic()
    }

    pub fn can_insert_text_after(&self) -> bool {
        !self.is_atomic()
    }

    /// Surface text contributed by this node alone (children excluded).
    pub fn own_text(&self) -> &str {
        match self {
            Node::Text { text } => text,
            Node::Word { word, .. } => word,
            Node::Remark { text } => text,
            _ => "",
        }
    }

    /// Persisted id, for the variants that carry one.
    pub fn database_id(&self) -> Option<&str> {
        match self {
            Node::Word { database_id, .. }
            | Node::Sentence { database_id, .. }
            | Node::GrammarPointContainer { database_id, .. } => database_id.as_deref(),
            _ => None,
        }
    }

    /// Write a persisted id onto the node. Returns false for variants that
    /// do not carry one.
    pub fn set_database_id(&mut self, id: String) -> bool {
        match self {
            Node::Word { database_id, .. }
            | Node::Sentence { database_id, .. }
            | Node::GrammarPointContainer { database_id, .. } => {
                *database_id = Some(id);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Node {
        Node::Word {
            word: s.to_string(),
            translations: vec![],
            database_id: None,
            auto_fill: false,
        }
    }

    #[test]
    fn test_type_names_round_trip() {
        let kinds = [
            NodeKind::Root,
            NodeKind::Paragraph,
            NodeKind::Text,
            NodeKind::Word,
            NodeKind::Sentence,
            NodeKind::SentenceToggle,
            NodeKind::GrammarPointContainer,
            NodeKind::GrammarPointTitle,
            NodeKind::GrammarPointContent,
            NodeKind::DialogueContainer,
            NodeKind::DialogueSpeaker,
            NodeKind::DialogueSpeech,
            NodeKind::SplitLayoutContainer,
            NodeKind::SplitLayoutColumn,
            NodeKind::Image,
            NodeKind::Remark,
        ];

        for kind in kinds {
            assert_eq!(NodeKind::from_type_name(kind.type_name()), Some(kind));
        }
    }

    #[test]
    fn test_unrecognized_type_name_is_none() {
        assert_eq!(NodeKind::from_type_name("hologram"), None);
        // "unknown" is an output-only tag, never resolved back to a variant.
        assert_eq!(NodeKind::from_type_name("unknown"), None);
    }

    #[test]
    fn test_atomic_nodes_refuse_merging_and_text() {
        let w = word("casa");
        assert!(!w.can_merge_with(&word("casa")));
        assert!(!w.can_insert_text_before());
        assert!(!w.can_insert_text_after());

        assert!(!Node::SentenceToggle.can_merge_with(&Node::SentenceToggle));
    }

    #[test]
    fn test_like_containers_merge() {
        assert!(Node::Paragraph.can_merge_with(&Node::Paragraph));

        let a = Node::Sentence {
            translation: String::new(),
            database_id: None,
            show_translation: false,
        };
        let b = a.clone();
        assert!(a.can_merge_with(&b));

        assert!(!Node::Paragraph.can_merge_with(&a));
    }

    #[test]
    fn test_never_empty_containers() {
        assert!(!Node::SplitLayoutColumn.can_be_empty());
        assert!(Node::Paragraph.can_be_empty());
        assert!(Node::GrammarPointTitle.can_be_empty());
    }

    #[test]
    fn test_database_id_attach() {
        let mut w = word("casa");
        assert_eq!(w.database_id(), None);
        assert!(w.set_database_id("w1".to_string()));
        assert_eq!(w.database_id(), Some("w1"));

        let mut p = Node::Paragraph;
        assert!(!p.set_database_id("p1".to_string()));
    }
}
