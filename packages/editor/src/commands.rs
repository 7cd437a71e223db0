//! # Editing Commands
//!
//! High-level semantic operations on a glossa document.
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: each command represents one user-level action
//! 2. **Fall-through**: a command whose preconditions do not hold returns
//!    [`Outcome::NotHandled`] so the host engine can run default behavior;
//!    it never errors on a bad selection
//! 3. **Selection continuity**: every handled command leaves the selection
//!    somewhere meaningful
//!
//! Structural invariants are not re-checked here; the editor runs the
//! [`transforms`](crate::transforms) sweep after every handled command.

use glossa_document::{DocumentTree, Node, NodeKey, NodeKind};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::editor::{Editor, EditorSettings};
use crate::errors::EditorError;
use crate::selection::{ordered_endpoints, selected_block_groups, Point, Selection};

/// Semantic commands dispatched through [`Editor::apply`]. Serializable so a
/// host can log, replay, or ship them across a worker boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Command {
    /// Replace the selection (or an explicit target node) with a word
    /// annotation. In mark-all-occurrences mode, other case-insensitive
    /// occurrences of the surface text get auto-fill words.
    InsertWord {
        word: String,
        translations: Vec<String>,
        database_id: Option<String>,
        target: Option<NodeKey>,
    },

    /// Replace a word's translation list.
    SetWordTranslations {
        key: NodeKey,
        translations: Vec<String>,
    },

    /// Wrap the selected blocks in a sentence, or unwrap when the selection
    /// already sits inside one.
    ToggleSentence,

    SetSentenceTranslation { key: NodeKey, translation: String },

    SetSentenceVisibility { key: NodeKey, show: bool },

    /// Wrap the selected blocks into a new grammar point's content.
    InsertGrammarPoint,

    /// Flip a grammar point between collapsed and expanded.
    ToggleGrammarPoint { key: NodeKey },

    /// Move the selected top-level blocks into a fresh two-column layout.
    SetSplitLayout,

    /// Dissolve a split layout back into its parent.
    SetFullLayout { key: NodeKey },

    /// Reverse the column order of a split layout.
    SwapSplitColumns { key: NodeKey },

    /// Convert `speaker: speech` paragraphs into a dialogue.
    InsertDialogue,

    InsertImage { src: String, alt: String },

    InsertRemark { text: String },

    /// Write a persisted id onto a word/sentence/grammar point node. Used by
    /// reconciliation so the write goes through the normal transaction path.
    AttachDatabaseId { key: NodeKey, id: String },

    /// Boundary-aware backspace around sentences and words.
    Backspace,

    /// Forward counterpart of [`Command::Backspace`].
    DeleteForward,

    /// Make an atomic node escapable: insert an empty text sibling on the
    /// given side when none exists, so arrow keys have somewhere to land.
    EscapeBoundary { key: NodeKey, forward: bool },
}

/// Whether a command consumed the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    NotHandled,
}

impl Command {
    /// Run the command against the editor state. Only structural errors
    /// (arena-level bugs) propagate; precondition misses are `NotHandled`.
    pub(crate) fn run(
        &self,
        editor: &mut Editor,
        settings: &EditorSettings,
    ) -> Result<Outcome, EditorError> {
        match self {
            Command::InsertWord {
                word,
                translations,
                database_id,
                target,
            } => insert_word(editor, settings, word, translations, database_id, *target),
            Command::SetWordTranslations { key, translations } => {
                set_word_translations(editor, *key, translations)
            }
            Command::ToggleSentence => toggle_sentence(editor),
            Command::SetSentenceTranslation { key, translation } => {
                set_sentence_translation(editor, *key, translation)
            }
            Command::SetSentenceVisibility { key, show } => {
                set_sentence_visibility(editor, *key, *show)
            }
            Command::InsertGrammarPoint => insert_grammar_point(editor),
            Command::ToggleGrammarPoint { key } => toggle_grammar_point(editor, *key),
            Command::SetSplitLayout => set_split_layout(editor),
            Command::SetFullLayout { key } => set_full_layout(editor, *key),
            Command::SwapSplitColumns { key } => swap_split_columns(editor, *key),
            Command::InsertDialogue => insert_dialogue(editor),
            Command::InsertImage { src, alt } => insert_block_leaf(
                editor,
                Node::Image {
                    src: src.clone(),
                    alt: alt.clone(),
                },
            ),
            Command::InsertRemark { text } => insert_block_leaf(
                editor,
                Node::Remark { text: text.clone() },
            ),
            Command::AttachDatabaseId { key, id } => attach_database_id(editor, *key, id),
            Command::Backspace => backspace(editor),
            Command::DeleteForward => delete_forward(editor),
            Command::EscapeBoundary { key, forward } => escape_boundary(editor, *key, *forward),
        }
    }
}

// ---------------------------------------------------------------------------
// Words

fn insert_word(
    editor: &mut Editor,
    settings: &EditorSettings,
    word: &str,
    translations: &[String],
    database_id: &Option<String>,
    target: Option<NodeKey>,
) -> Result<Outcome, EditorError> {
    if word.trim().is_empty() {
        return Ok(Outcome::NotHandled);
    }

    let make_word = |auto_fill: bool| Node::Word {
        word: word.to_string(),
        translations: translations.to_vec(),
        database_id: database_id.clone(),
        auto_fill,
    };

    let tree = &mut editor.tree;
    let primary = if let Some(target) = target {
        if !tree.contains(target) || tree.parent(target).is_none() {
            return Ok(Outcome::NotHandled);
        }
        tree.replace_with(target, make_word(false))?
    } else {
        match editor.selection.clone() {
            Some(Selection::Node(key)) if tree.contains(key) && tree.parent(key).is_some() => {
                tree.replace_with(key, make_word(false))?
            }
            Some(selection @ (Selection::Caret(_) | Selection::Range { .. })) => {
                let (first, last) = match ordered_endpoints(tree, &selection) {
                    Some(points) => points,
                    None => return Ok(Outcome::NotHandled),
                };
                // Only a selection within one node can be replaced here.
                if first.key != last.key {
                    return Ok(Outcome::NotHandled);
                }
                let text = match tree.node(first.key) {
                    Some(Node::Text { text }) => Some(text.clone()),
                    Some(node) if node.is_container() => None,
                    _ => return Ok(Outcome::NotHandled),
                };

                // Collapsed caret in a container: insert at the child index
                // instead of splitting a text run.
                let Some(text) = text else {
                    if first.offset != last.offset {
                        return Ok(Outcome::NotHandled);
                    }
                    let index = first.offset.min(tree.children(first.key).len());
                    let word_key = tree.create(make_word(false));
                    tree.insert_child_at(first.key, index, word_key)?;
                    if settings.mark_all_occurrences {
                        mark_other_occurrences(tree, word, translations, database_id)?;
                    }
                    editor.selection = Some(Selection::Node(word_key));
                    return Ok(Outcome::Handled);
                };
                let start = byte_offset(&text, first.offset);
                let end = byte_offset(&text, last.offset);
                let before = text[..start].to_string();
                let after = text[end..].to_string();

                let word_key = tree.create(make_word(false));
                tree.insert_after(first.key, word_key)?;
                if !after.is_empty() {
                    let after_key = tree.create(Node::Text { text: after });
                    tree.insert_after(word_key, after_key)?;
                }
                if before.is_empty() {
                    tree.remove(first.key)?;
                } else if let Some(Node::Text { text }) = tree.node_mut(first.key) {
                    *text = before;
                }
                word_key
            }
            _ => return Ok(Outcome::NotHandled),
        }
    };

    if settings.mark_all_occurrences {
        mark_other_occurrences(tree, word, translations, database_id)?;
    }

    editor.selection = Some(Selection::Node(primary));
    Ok(Outcome::Handled)
}

/// Wrap every other case-insensitive occurrence of `word` found in the
/// document's text runs in an auto-fill word node.
fn mark_other_occurrences(
    tree: &mut DocumentTree,
    word: &str,
    translations: &[String],
    database_id: &Option<String>,
) -> Result<(), EditorError> {
    let pattern = RegexBuilder::new(&regex::escape(word))
        .case_insensitive(true)
        .build()
        .expect("escaped literal is a valid pattern");

    for text_key in tree.keys_of_kind(NodeKind::Text) {
        let text = match tree.node(text_key) {
            Some(Node::Text { text }) => text.clone(),
            _ => continue,
        };
        let ranges: Vec<(usize, usize)> = pattern
            .find_iter(&text)
            .map(|m| (m.start(), m.end()))
            .collect();
        if ranges.is_empty() {
            continue;
        }

        // Rebuild the run as text / word / text / ... segments in place.
        fn push_segment(tree: &mut DocumentTree, node: Node, anchor: &mut NodeKey) {
            let key = tree.create(node);
            tree.insert_after(*anchor, key).ok();
            *anchor = key;
        }

        let mut anchor = text_key;
        let mut cursor = 0;
        for (start, end) in ranges {
            if start > cursor {
                let segment = Node::Text {
                    text: text[cursor..start].to_string(),
                };
                push_segment(tree, segment, &mut anchor);
            }
            let marked = Node::Word {
                word: text[start..end].to_string(),
                translations: translations.to_vec(),
                database_id: database_id.clone(),
                auto_fill: true,
            };
            push_segment(tree, marked, &mut anchor);
            cursor = end;
        }
        if cursor < text.len() {
            let tail = Node::Text {
                text: text[cursor..].to_string(),
            };
            push_segment(tree, tail, &mut anchor);
        }
        tree.remove(text_key)?;
    }
    Ok(())
}

fn set_word_translations(
    editor: &mut Editor,
    key: NodeKey,
    translations: &[String],
) -> Result<Outcome, EditorError> {
    match editor.tree.node_mut(key) {
        Some(Node::Word {
            translations: existing,
            ..
        }) => {
            *existing = translations.to_vec();
            Ok(Outcome::Handled)
        }
        _ => Ok(Outcome::NotHandled),
    }
}

// ---------------------------------------------------------------------------
// Sentences

fn sentence_of(tree: &DocumentTree, key: NodeKey) -> Option<NodeKey> {
    if tree.kind(key) == Some(NodeKind::Sentence) {
        return Some(key);
    }
    tree.nearest_ancestor_of_kind(key, NodeKind::Sentence)
}

fn toggle_sentence(editor: &mut Editor) -> Result<Outcome, EditorError> {
    let selection = match editor.selection.clone() {
        Some(s @ (Selection::Caret(_) | Selection::Range { .. })) => s,
        _ => return Ok(Outcome::NotHandled),
    };
    let tree = &mut editor.tree;
    let (first, last) = match ordered_endpoints(tree, &selection) {
        Some(points) => points,
        None => return Ok(Outcome::NotHandled),
    };

    // Selection entirely inside one sentence: unwrap it, keeping only the
    // real content.
    let first_sentence = sentence_of(tree, first.key);
    if first_sentence.is_some() && first_sentence == sentence_of(tree, last.key) {
        let sentence = first_sentence.expect("checked");
        for child in tree.children(sentence).to_vec() {
            if tree.kind(child) == Some(NodeKind::SentenceToggle) {
                tree.remove(child)?;
            }
        }
        let hoisted = tree.splice_out(sentence)?;
        editor.selection = hoisted
            .first()
            .map(|&key| Selection::Caret(Point::start_of(key)));
        return Ok(Outcome::Handled);
    }

    // Otherwise wrap: one new sentence per same-parent run of blocks.
    let groups = selected_block_groups(tree, &selection);
    if groups.is_empty() {
        return Ok(Outcome::NotHandled);
    }

    let mut first_created = None;
    for group in groups {
        let created = wrap_group_in_sentence(tree, &group)?;
        first_created.get_or_insert(created);
    }
    editor.selection = first_created.map(Selection::Node);
    Ok(Outcome::Handled)
}

/// Wrap one run of same-parent blocks into a fresh sentence, merging any
/// sentence already in the run instead of nesting it.
fn wrap_group_in_sentence(
    tree: &mut DocumentTree,
    group: &[NodeKey],
) -> Result<NodeKey, EditorError> {
    let first = group[0];
    let parent = tree.parent(first).expect("blocks are attached");
    let index = tree.index_in_parent(first).expect("attached");

    let sentence = tree.create(Node::Sentence {
        translation: String::new(),
        database_id: None,
        show_translation: false,
    });
    tree.insert_child_at(parent, index, sentence)?;

    for &block in group {
        if tree.kind(block) == Some(NodeKind::Sentence) {
            for child in tree.children(block).to_vec() {
                if tree.kind(child) == Some(NodeKind::SentenceToggle) {
                    tree.remove(child)?;
                }
            }
            tree.move_children(block, sentence)?;
            tree.remove(block)?;
        } else {
            tree.detach(block)?;
            tree.append_child(sentence, block)?;
        }
    }

    let toggle = tree.create(Node::SentenceToggle);
    tree.append_child(sentence, toggle)?;
    Ok(sentence)
}

fn set_sentence_translation(
    editor: &mut Editor,
    key: NodeKey,
    translation: &str,
) -> Result<Outcome, EditorError> {
    match editor.tree.node_mut(key) {
        Some(Node::Sentence {
            translation: existing,
            ..
        }) => {
            *existing = translation.to_string();
            Ok(Outcome::Handled)
        }
        _ => Ok(Outcome::NotHandled),
    }
}

fn set_sentence_visibility(
    editor: &mut Editor,
    key: NodeKey,
    show: bool,
) -> Result<Outcome, EditorError> {
    match editor.tree.node_mut(key) {
        Some(Node::Sentence {
            show_translation, ..
        }) => {
            *show_translation = show;
            Ok(Outcome::Handled)
        }
        _ => Ok(Outcome::NotHandled),
    }
}

// ---------------------------------------------------------------------------
// Grammar points

fn insert_grammar_point(editor: &mut Editor) -> Result<Outcome, EditorError> {
    let selection = match editor.selection.clone() {
        Some(s) => s,
        None => return Ok(Outcome::NotHandled),
    };
    let tree = &mut editor.tree;
    let groups = selected_block_groups(tree, &selection);
    let group = match groups.first() {
        Some(group) => group.clone(),
        None => return Ok(Outcome::NotHandled),
    };

    let first = group[0];
    let parent = tree.parent(first).expect("attached");
    let index = tree.index_in_parent(first).expect("attached");

    let container = tree.create(Node::GrammarPointContainer {
        database_id: None,
        open: true,
    });
    tree.insert_child_at(parent, index, container)?;
    let title = tree.create(Node::GrammarPointTitle);
    tree.append_child(container, title)?;
    let content = tree.create(Node::GrammarPointContent);
    tree.append_child(container, content)?;

    for &block in &group {
        tree.detach(block)?;
        tree.append_child(content, block)?;
    }

    editor.selection = Some(Selection::Caret(Point::start_of(title)));
    Ok(Outcome::Handled)
}

fn toggle_grammar_point(editor: &mut Editor, key: NodeKey) -> Result<Outcome, EditorError> {
    match editor.tree.node_mut(key) {
        Some(Node::GrammarPointContainer { open, .. }) => {
            *open = !*open;
            Ok(Outcome::Handled)
        }
        _ => Ok(Outcome::NotHandled),
    }
}

// ---------------------------------------------------------------------------
// Split layout

fn set_split_layout(editor: &mut Editor) -> Result<Outcome, EditorError> {
    let selection = match editor.selection.clone() {
        Some(s) => s,
        None => return Ok(Outcome::NotHandled),
    };
    let tree = &mut editor.tree;
    let groups = selected_block_groups(tree, &selection);
    let group = match groups.first() {
        Some(group) => group.clone(),
        None => return Ok(Outcome::NotHandled),
    };

    // Splitting is a top-level operation only.
    let root = tree.root();
    if group.iter().any(|&b| tree.parent(b) != Some(root)) {
        return Ok(Outcome::NotHandled);
    }

    let index = tree.index_in_parent(group[0]).expect("attached");
    let container = tree.create(Node::SplitLayoutContainer);
    tree.insert_child_at(root, index, container)?;
    let left = tree.create(Node::SplitLayoutColumn);
    tree.append_child(container, left)?;
    let right = tree.create(Node::SplitLayoutColumn);
    tree.append_child(container, right)?;

    for &block in &group {
        tree.detach(block)?;
        tree.append_child(left, block)?;
    }
    let filler = tree.create(Node::Paragraph);
    tree.append_child(right, filler)?;

    editor.selection = Some(Selection::Caret(Point::start_of(group[0])));
    Ok(Outcome::Handled)
}

fn set_full_layout(editor: &mut Editor, key: NodeKey) -> Result<Outcome, EditorError> {
    let tree = &mut editor.tree;
    let root = tree.root();
    if tree.kind(key) != Some(NodeKind::SplitLayoutContainer) || tree.parent(key) != Some(root) {
        // Nested containers are not dissolved from here.
        return Ok(Outcome::NotHandled);
    }

    let index = tree.index_in_parent(key).expect("attached");
    let mut content = Vec::new();
    for column in tree.children(key).to_vec() {
        content.extend(tree.children(column).to_vec());
    }
    for &child in &content {
        tree.detach(child)?;
    }
    tree.remove(key)?;
    for (offset, &child) in content.iter().enumerate() {
        tree.insert_child_at(root, index + offset, child)?;
    }

    editor.selection = content
        .first()
        .map(|&key| Selection::Caret(Point::start_of(key)));
    Ok(Outcome::Handled)
}

fn swap_split_columns(editor: &mut Editor, key: NodeKey) -> Result<Outcome, EditorError> {
    let tree = &mut editor.tree;
    if tree.kind(key) != Some(NodeKind::SplitLayoutContainer) {
        return Ok(Outcome::NotHandled);
    }
    let children = tree.children(key).to_vec();
    if children.len() != 2 {
        return Ok(Outcome::NotHandled);
    }
    tree.detach(children[1])?;
    tree.insert_child_at(key, 0, children[1])?;
    Ok(Outcome::Handled)
}

// ---------------------------------------------------------------------------
// Dialogue

fn insert_dialogue(editor: &mut Editor) -> Result<Outcome, EditorError> {
    let selection = match editor.selection.clone() {
        Some(s) => s,
        None => return Ok(Outcome::NotHandled),
    };
    let tree = &mut editor.tree;
    let groups = selected_block_groups(tree, &selection);
    let group = match groups.first() {
        Some(group) => group.clone(),
        None => return Ok(Outcome::NotHandled),
    };

    let line = Regex::new(r"^\s*([^:]+?)\s*:\s*(.+?)\s*$").expect("static pattern");

    // One (speaker, speech) pair per matching paragraph; malformed lines
    // stay behind untouched.
    let mut pairs = Vec::new();
    let mut consumed = Vec::new();
    for &block in &group {
        if tree.kind(block) != Some(NodeKind::Paragraph) {
            continue;
        }
        let text = tree.text_content(block);
        if let Some(captures) = line.captures(&text) {
            pairs.push((captures[1].to_string(), captures[2].to_string()));
            consumed.push(block);
        }
    }
    if pairs.is_empty() {
        return Ok(Outcome::NotHandled);
    }

    let first = consumed[0];
    let parent = tree.parent(first).expect("attached");
    let index = tree.index_in_parent(first).expect("attached");
    let container = tree.create(Node::DialogueContainer);
    tree.insert_child_at(parent, index, container)?;

    for (speaker, speech) in pairs {
        let speaker_node = tree.create(Node::DialogueSpeaker);
        tree.append_child(container, speaker_node)?;
        let speaker_text = tree.create(Node::Text { text: speaker });
        tree.append_child(speaker_node, speaker_text)?;

        let speech_node = tree.create(Node::DialogueSpeech);
        tree.append_child(container, speech_node)?;
        let speech_text = tree.create(Node::Text { text: speech });
        tree.append_child(speech_node, speech_text)?;
    }

    for block in consumed {
        tree.remove(block)?;
    }

    editor.selection = Some(Selection::Caret(Point::start_of(container)));
    Ok(Outcome::Handled)
}

// ---------------------------------------------------------------------------
// Block leaves, ids

fn insert_block_leaf(editor: &mut Editor, node: Node) -> Result<Outcome, EditorError> {
    let tree = &mut editor.tree;
    let anchor = editor
        .selection
        .as_ref()
        .and_then(|s| ordered_endpoints(tree, s))
        .and_then(|(_, last)| crate::selection::containing_block(tree, last.key));

    let key = tree.create(node);
    match anchor {
        Some(anchor) => tree.insert_after(anchor, key)?,
        None => {
            let root = tree.root();
            tree.append_child(root, key)?;
        }
    }
    editor.selection = Some(Selection::Node(key));
    Ok(Outcome::Handled)
}

fn attach_database_id(editor: &mut Editor, key: NodeKey, id: &str) -> Result<Outcome, EditorError> {
    match editor.tree.node_mut(key) {
        Some(node) => {
            if node.set_database_id(id.to_string()) {
                Ok(Outcome::Handled)
            } else {
                Ok(Outcome::NotHandled)
            }
        }
        _ => Ok(Outcome::NotHandled),
    }
}

// ---------------------------------------------------------------------------
// Deletion adjacency

fn backspace(editor: &mut Editor) -> Result<Outcome, EditorError> {
    let tree = &mut editor.tree;
    match editor.selection.clone() {
        // A selected atomic node is deleted as a unit.
        Some(Selection::Node(key))
            if tree.node(key).is_some_and(Node::is_atomic) && tree.parent(key).is_some() =>
        {
            let prev = tree.prev_sibling(key);
            let parent = tree.parent(key).expect("checked");
            tree.remove(key)?;
            editor.selection = Some(match prev {
                Some(prev) => caret_at_end(tree, prev),
                None => Selection::Caret(Point::start_of(parent)),
            });
            Ok(Outcome::Handled)
        }

        Some(Selection::Caret(point)) if point.offset == 0 => {
            let prev = match tree.prev_sibling(point.key) {
                Some(prev) => prev,
                None => return Ok(Outcome::NotHandled),
            };
            match tree.kind(prev) {
                // Re-enter the sentence instead of deleting through it.
                Some(NodeKind::Sentence) => {
                    let target = tree
                        .children(prev)
                        .iter()
                        .rev()
                        .copied()
                        .find(|&c| tree.kind(c) != Some(NodeKind::SentenceToggle));
                    editor.selection = Some(match target {
                        Some(child) => caret_at_end(tree, child),
                        None => Selection::Caret(Point::start_of(prev)),
                    });
                    Ok(Outcome::Handled)
                }
                // Select the word so the next backspace deletes it whole.
                Some(NodeKind::Word) => {
                    editor.selection = Some(Selection::Node(prev));
                    Ok(Outcome::Handled)
                }
                _ => Ok(Outcome::NotHandled),
            }
        }

        _ => Ok(Outcome::NotHandled),
    }
}

fn delete_forward(editor: &mut Editor) -> Result<Outcome, EditorError> {
    let tree = &mut editor.tree;
    match editor.selection.clone() {
        Some(Selection::Node(key))
            if tree.node(key).is_some_and(Node::is_atomic) && tree.parent(key).is_some() =>
        {
            let next = tree.next_sibling(key);
            let parent = tree.parent(key).expect("checked");
            tree.remove(key)?;
            editor.selection = Some(match next {
                Some(next) => Selection::Caret(Point::start_of(next)),
                None => Selection::Caret(Point::start_of(parent)),
            });
            Ok(Outcome::Handled)
        }

        Some(Selection::Caret(point)) if at_end_of_node(tree, point) => {
            let next = match tree.next_sibling(point.key) {
                Some(next) => next,
                None => return Ok(Outcome::NotHandled),
            };
            match tree.kind(next) {
                Some(NodeKind::Sentence) => {
                    let target = tree.first_child(next);
                    editor.selection = Some(match target {
                        Some(child) => Selection::Caret(Point::start_of(child)),
                        None => Selection::Caret(Point::start_of(next)),
                    });
                    Ok(Outcome::Handled)
                }
                Some(NodeKind::Word) => {
                    editor.selection = Some(Selection::Node(next));
                    Ok(Outcome::Handled)
                }
                _ => Ok(Outcome::NotHandled),
            }
        }

        _ => Ok(Outcome::NotHandled),
    }
}

fn escape_boundary(editor: &mut Editor, key: NodeKey, forward: bool) -> Result<Outcome, EditorError> {
    let tree = &mut editor.tree;
    let eligible = tree
        .node(key)
        .is_some_and(|n| n.is_atomic() || n.kind() == NodeKind::Sentence);
    if !eligible || tree.parent(key).is_none() {
        return Ok(Outcome::NotHandled);
    }
    let sibling = if forward {
        tree.next_sibling(key)
    } else {
        tree.prev_sibling(key)
    };
    if sibling.is_some() {
        return Ok(Outcome::NotHandled);
    }

    // Zero-width spacer so the caret has somewhere to land.
    let spacer = tree.create(Node::Text {
        text: String::new(),
    });
    if forward {
        tree.insert_after(key, spacer)?;
    } else {
        tree.insert_before(key, spacer)?;
    }
    editor.selection = Some(Selection::caret(spacer, 0));
    Ok(Outcome::Handled)
}

// ---------------------------------------------------------------------------
// Helpers

fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

fn at_end_of_node(tree: &DocumentTree, point: Point) -> bool {
    match tree.node(point.key) {
        Some(Node::Text { text }) => point.offset >= text.chars().count(),
        Some(_) => point.offset >= tree.children(point.key).len(),
        None => false,
    }
}

/// A caret at the very end of `key`: after the last character of a text run,
/// or after the last child otherwise.
fn caret_at_end(tree: &DocumentTree, key: NodeKey) -> Selection {
    match tree.node(key) {
        Some(Node::Text { text }) => Selection::caret(key, text.chars().count()),
        Some(node) if node.is_atomic() => Selection::Node(key),
        Some(_) => Selection::caret(key, tree.children(key).len()),
        None => Selection::caret(key, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization_round_trip() {
        let command = Command::InsertWord {
            word: "casa".to_string(),
            translations: vec!["house".to_string()],
            database_id: Some("w1".to_string()),
            target: None,
        };

        let json = serde_json::to_string(&command).unwrap();
        let deserialized: Command = serde_json::from_str(&json).unwrap();

        assert_eq!(command, deserialized);
    }

    #[test]
    fn test_byte_offset_respects_char_boundaries() {
        let text = "日本語abc";
        assert_eq!(byte_offset(text, 0), 0);
        assert_eq!(byte_offset(text, 1), 3);
        assert_eq!(byte_offset(text, 3), 9);
        // Past the end clamps to the full length.
        assert_eq!(byte_offset(text, 99), text.len());
    }
}
