//! # Selection Model
//!
//! A lightweight mirror of the host engine's selection: a caret in a text
//! node, a range between two points, or a whole selected node. Command
//! handlers consult it for preconditions and commands move it to keep the
//! cursor meaningful after structural edits.

use std::collections::HashMap;

use glossa_document::{DocumentTree, NodeKey, NodeKind};

/// One end of a range: a node plus a character offset inside it (offsets are
/// only meaningful for text nodes; elsewhere they index children).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }

    pub fn start_of(key: NodeKey) -> Self {
        Self { key, offset: 0 }
    }
}

/// Current selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Collapsed cursor.
    Caret(Point),

    /// Anchor/focus range; focus may precede anchor in document order.
    Range { anchor: Point, focus: Point },

    /// A whole node selected as a unit (atomic decorators).
    Node(NodeKey),
}

impl Selection {
    pub fn caret(key: NodeKey, offset: usize) -> Self {
        Selection::Caret(Point::new(key, offset))
    }

    /// Every key the selection touches, unordered.
    pub fn keys(&self) -> Vec<NodeKey> {
        match self {
            Selection::Caret(p) => vec![p.key],
            Selection::Range { anchor, focus } => vec![anchor.key, focus.key],
            Selection::Node(key) => vec![*key],
        }
    }

    /// Whether every referenced node still exists in the tree.
    pub fn is_valid(&self, tree: &DocumentTree) -> bool {
        self.keys().into_iter().all(|k| tree.contains(k))
    }
}

/// Map from node key to its position in document order.
pub fn document_order(tree: &DocumentTree) -> HashMap<NodeKey, usize> {
    tree.walk()
        .into_iter()
        .enumerate()
        .map(|(i, k)| (k, i))
        .collect()
}

/// The anchor/focus endpoints in document order (first, last).
pub fn ordered_endpoints(tree: &DocumentTree, selection: &Selection) -> Option<(Point, Point)> {
    match selection {
        Selection::Caret(p) => Some((*p, *p)),
        Selection::Node(key) => Some((Point::start_of(*key), Point::start_of(*key))),
        Selection::Range { anchor, focus } => {
            let order = document_order(tree);
            let a = order.get(&anchor.key)?;
            let f = order.get(&focus.key)?;
            if a < f || (a == f && anchor.offset <= focus.offset) {
                Some((*anchor, *focus))
            } else {
                Some((*focus, *anchor))
            }
        }
    }
}

/// The block a key belongs to for block-level commands: the highest ancestor
/// (or the key itself) whose parent is a block root: the document root, a
/// grammar point content, or a split layout column.
pub fn containing_block(tree: &DocumentTree, key: NodeKey) -> Option<NodeKey> {
    let mut cursor = key;
    loop {
        let parent = tree.parent(cursor)?;
        if matches!(
            tree.kind(parent),
            Some(NodeKind::Root)
                | Some(NodeKind::GrammarPointContent)
                | Some(NodeKind::SplitLayoutColumn)
        ) {
            return Some(cursor);
        }
        cursor = parent;
    }
}

/// The blocks touched by the selection, grouped into runs of consecutive
/// siblings. A parent change starts a new group, so each group can be
/// wrapped as one unit.
pub fn selected_block_groups(tree: &DocumentTree, selection: &Selection) -> Vec<Vec<NodeKey>> {
    let (first, last) = match ordered_endpoints(tree, selection) {
        Some(points) => points,
        None => return Vec::new(),
    };
    let start = match containing_block(tree, first.key) {
        Some(b) => b,
        None => return Vec::new(),
    };
    let end = match containing_block(tree, last.key) {
        Some(b) => b,
        None => return Vec::new(),
    };

    let walk = tree.walk();
    let start_pos = walk.iter().position(|&k| k == start);
    let end_pos = walk.iter().position(|&k| k == end);
    let (start_pos, end_pos) = match (start_pos, end_pos) {
        (Some(s), Some(e)) if s <= e => (s, e),
        _ => return Vec::new(),
    };

    // Topmost blocks in the span: skip anything nested under a block we
    // already collected.
    let mut blocks: Vec<NodeKey> = Vec::new();
    for &key in &walk[start_pos..=end_pos] {
        if let Some(&previous) = blocks.last() {
            if tree.is_ancestor_of(previous, key) {
                continue;
            }
        }
        let parent = match tree.parent(key) {
            Some(p) => p,
            None => continue,
        };
        if matches!(
            tree.kind(parent),
            Some(NodeKind::Root)
                | Some(NodeKind::GrammarPointContent)
                | Some(NodeKind::SplitLayoutColumn)
        ) {
            blocks.push(key);
        }
    }

    let mut groups: Vec<Vec<NodeKey>> = Vec::new();
    for key in blocks {
        let continues_run = groups
            .last()
            .and_then(|group| group.last())
            .is_some_and(|&prev| tree.next_sibling(prev) == Some(key));
        if continues_run {
            groups.last_mut().expect("checked").push(key);
        } else {
            groups.push(vec![key]);
        }
    }
    groups
}

/// Flattened form of [`selected_block_groups`].
pub fn selected_blocks(tree: &DocumentTree, selection: &Selection) -> Vec<NodeKey> {
    selected_block_groups(tree, selection)
        .into_iter()
        .flatten()
        .collect()
}
