//! # Structural Transforms
//!
//! Invariant repair run after every committed command. Each rule inspects
//! one node and either leaves it alone or fixes it; the runner sweeps the
//! tree until a full pass makes no change.
//!
//! ## Design
//!
//! - **Unwrap, don't reconstruct**: a container with the wrong shape is
//!   spliced out and its content hoisted; no repair heuristics.
//! - **Idempotent**: every rule is a no-op on an already-valid node, so the
//!   runner may re-sweep speculatively.
//! - **Silent**: violations are normal editing fallout, not errors; nothing
//!   here is surfaced to the user.

use glossa_document::{DocumentTree, Node, NodeKey, NodeKind};

/// Passes are bounded as a backstop; real documents settle in two or three.
const MAX_PASSES: usize = 16;

/// Normalize the whole tree. Runs rule sweeps until a fixpoint.
pub fn run(tree: &mut DocumentTree) {
    for _ in 0..MAX_PASSES {
        if !pass(tree) {
            return;
        }
    }
    tracing::warn!(
        passes = MAX_PASSES,
        "structural transforms did not settle; leaving tree as-is"
    );
}

fn pass(tree: &mut DocumentTree) -> bool {
    let mut changed = false;
    for key in tree.walk() {
        // Earlier fixes in this pass may have dropped the node.
        if !tree.contains(key) {
            continue;
        }
        if apply_rule(tree, key) {
            changed = true;
        }
    }
    let root = tree.root();
    if root_padding(tree, root) {
        changed = true;
    }
    changed
}

fn apply_rule(tree: &mut DocumentTree, key: NodeKey) -> bool {
    let kind = match tree.kind(key) {
        Some(kind) => kind,
        None => return false,
    };

    match kind {
        NodeKind::GrammarPointTitle | NodeKind::GrammarPointContent => {
            if parent_kind(tree, key) != Some(NodeKind::GrammarPointContainer) {
                return tree.splice_out(key).is_ok();
            }
            if kind == NodeKind::GrammarPointContent {
                return root_padding(tree, key);
            }
            false
        }

        NodeKind::SentenceToggle => {
            if parent_kind(tree, key) != Some(NodeKind::Sentence) {
                return tree.remove(key).is_ok();
            }
            false
        }

        NodeKind::DialogueSpeaker | NodeKind::DialogueSpeech => {
            if parent_kind(tree, key) != Some(NodeKind::DialogueContainer) {
                return tree.splice_out(key).is_ok();
            }
            false
        }

        NodeKind::SplitLayoutColumn => split_column_rule(tree, key),
        NodeKind::SplitLayoutContainer => split_container_rule(tree, key),
        NodeKind::GrammarPointContainer => grammar_container_rule(tree, key),
        NodeKind::Image => placement_rule(tree, key),
        NodeKind::Sentence => sentence_rule(tree, key),

        _ => false,
    }
}

fn parent_kind(tree: &DocumentTree, key: NodeKey) -> Option<NodeKind> {
    tree.parent(key).and_then(|p| tree.kind(p))
}

fn is_block_root(kind: Option<NodeKind>) -> bool {
    matches!(
        kind,
        Some(NodeKind::Root) | Some(NodeKind::GrammarPointContent)
    )
}

/// Columns only live inside a split container and are never empty.
fn split_column_rule(tree: &mut DocumentTree, key: NodeKey) -> bool {
    if parent_kind(tree, key) != Some(NodeKind::SplitLayoutContainer) {
        return tree.splice_out(key).is_ok();
    }

    let needs_paragraph = match tree.last_child(key) {
        None => true,
        // A trailing block decorator leaves no text position in the column.
        Some(last) => matches!(
            tree.kind(last),
            Some(NodeKind::Image) | Some(NodeKind::Unknown)
        ),
    };
    if needs_paragraph {
        let paragraph = tree.create(Node::Paragraph);
        tree.append_child(key, paragraph).is_ok()
    } else {
        false
    }
}

/// Exactly two columns, never nested inside another split container.
fn split_container_rule(tree: &mut DocumentTree, key: NodeKey) -> bool {
    if tree
        .nearest_ancestor_of_kind(key, NodeKind::SplitLayoutContainer)
        .is_some()
    {
        return unwrap_container(tree, key, &[NodeKind::SplitLayoutColumn]);
    }

    let children = tree.children(key).to_vec();
    let valid = children.len() == 2
        && children
            .iter()
            .all(|&c| tree.kind(c) == Some(NodeKind::SplitLayoutColumn));
    if valid {
        return false;
    }
    unwrap_container(tree, key, &[NodeKind::SplitLayoutColumn])
}

/// Exactly [Title, Content], placed under a block root.
fn grammar_container_rule(tree: &mut DocumentTree, key: NodeKey) -> bool {
    if !is_block_root(parent_kind(tree, key)) {
        return placement_rule(tree, key);
    }

    let children = tree.children(key).to_vec();
    let valid = children.len() == 2
        && tree.kind(children[0]) == Some(NodeKind::GrammarPointTitle)
        && tree.kind(children[1]) == Some(NodeKind::GrammarPointContent);
    if valid {
        return false;
    }

    unwrap_container(
        tree,
        key,
        &[NodeKind::GrammarPointTitle, NodeKind::GrammarPointContent],
    )
}

/// Hoist wrapper children of `key` out of their wrappers, then splice `key`
/// itself into its parent. "Unwrap and discard structure."
fn unwrap_container(tree: &mut DocumentTree, key: NodeKey, wrappers: &[NodeKind]) -> bool {
    for child in tree.children(key).to_vec() {
        if tree.kind(child).is_some_and(|k| wrappers.contains(&k)) {
            tree.splice_out(child).ok();
        }
    }
    tree.splice_out(key).is_ok()
}

/// Image and grammar point containers live directly under the nearest block
/// root; anything nested deeper is reinserted after its top-level ancestor.
fn placement_rule(tree: &mut DocumentTree, key: NodeKey) -> bool {
    if is_block_root(parent_kind(tree, key)) {
        return false;
    }

    // Find the ancestor that sits directly under a block root.
    let mut anchor = key;
    loop {
        let parent = match tree.parent(anchor) {
            Some(p) => p,
            None => return false, // detached subtree; nothing to do
        };
        if is_block_root(tree.kind(parent)) {
            break;
        }
        anchor = parent;
    }

    tree.detach(key).ok();
    tree.insert_after(anchor, key).is_ok()
}

/// A sentence holds at least one real child plus exactly one trailing
/// toggle, and never nests inside another sentence.
fn sentence_rule(tree: &mut DocumentTree, key: NodeKey) -> bool {
    if tree
        .nearest_ancestor_of_kind(key, NodeKind::Sentence)
        .is_some()
    {
        // Merge into the outer sentence: drop our toggle, hoist content.
        for child in tree.children(key).to_vec() {
            if tree.kind(child) == Some(NodeKind::SentenceToggle) {
                tree.remove(child).ok();
            }
        }
        return tree.splice_out(key).is_ok();
    }

    let children = tree.children(key).to_vec();
    let toggles: Vec<NodeKey> = children
        .iter()
        .copied()
        .filter(|&c| tree.kind(c) == Some(NodeKind::SentenceToggle))
        .collect();
    let real_count = children.len() - toggles.len();

    if real_count == 0 {
        return tree.remove(key).is_ok();
    }

    let well_formed =
        toggles.len() == 1 && tree.last_child(key) == Some(toggles[0]);
    if well_formed {
        return false;
    }

    for toggle in toggles {
        tree.remove(toggle).ok();
    }
    let toggle = tree.create(Node::SentenceToggle);
    tree.append_child(key, toggle).is_ok()
}

/// Block roots keep a trailing paragraph after any block that the caret
/// cannot enter, and never sit empty.
fn root_padding(tree: &mut DocumentTree, key: NodeKey) -> bool {
    let needs_paragraph = match tree.last_child(key) {
        None => true,
        Some(last) => matches!(
            tree.kind(last),
            Some(NodeKind::Image)
                | Some(NodeKind::GrammarPointContainer)
                | Some(NodeKind::SplitLayoutContainer)
                | Some(NodeKind::DialogueContainer)
                | Some(NodeKind::Remark)
                | Some(NodeKind::Unknown)
        ),
    };
    if !needs_paragraph {
        return false;
    }
    let paragraph = tree.create(Node::Paragraph);
    tree.append_child(key, paragraph).is_ok()
}
