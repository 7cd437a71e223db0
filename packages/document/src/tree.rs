//! # Document Tree
//!
//! Arena-backed rooted ordered tree. Every node lives in a key-indexed
//! arena; containers own an ordered list of child keys, and each node keeps
//! its parent key as a back-reference only.
//!
//! Attachment discipline: a node must be detached before it can be inserted
//! somewhere else. This keeps the one-parent invariant enforceable at every
//! mutation and makes cycles unrepresentable through the public API.

use std::collections::HashMap;

use crate::error::DocumentError;
use crate::key::{KeyGenerator, NodeKey};
use crate::node::{Node, NodeKind};

#[derive(Debug, Clone)]
struct NodeEntry {
    node: Node,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

/// A rooted, ordered document tree.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    entries: HashMap<NodeKey, NodeEntry>,
    root: NodeKey,
    keys: KeyGenerator,
}

impl DocumentTree {
    /// Create a tree containing a root with one empty paragraph.
    pub fn new() -> Self {
        let mut keys = KeyGenerator::new();
        let root = keys.next_key();
        let paragraph = keys.next_key();

        let mut entries = HashMap::new();
        entries.insert(
            root,
            NodeEntry {
                node: Node::Root,
                parent: None,
                children: vec![paragraph],
            },
        );
        entries.insert(
            paragraph,
            NodeEntry {
                node: Node::Paragraph,
                parent: Some(root),
                children: Vec::new(),
            },
        );

        Self { entries, root, keys }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn node_count(&self) -> usize {
        self.entries.len()
    }

    /// Create a detached node and return its key.
    pub fn create(&mut self, node: Node) -> NodeKey {
        let key = self.keys.next_key();
        self.entries.insert(
            key,
            NodeEntry {
                node,
                parent: None,
                children: Vec::new(),
            },
        );
        key
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.entries.get(&key).map(|e| &e.node)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.entries.get_mut(&key).map(|e| &mut e.node)
    }

    pub fn kind(&self, key: NodeKey) -> Option<NodeKind> {
        self.node(key).map(Node::kind)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.entries.get(&key).and_then(|e| e.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.entries
            .get(&key)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).first().copied()
    }

    pub fn last_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).last().copied()
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|&c| c == key)
    }

    pub fn prev_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        if index == 0 {
            None
        } else {
            self.children(parent).get(index - 1).copied()
        }
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Insert a detached node as the `index`-th child of `parent`.
    pub fn insert_child_at(
        &mut self,
        parent: NodeKey,
        index: usize,
        child: NodeKey,
    ) -> Result<(), DocumentError> {
        if !self.contains(child) {
            return Err(DocumentError::NodeNotFound(child));
        }
        if child == self.root {
            return Err(DocumentError::RootIsPermanent);
        }
        if self.parent(child).is_some() {
            return Err(DocumentError::AlreadyAttached(child));
        }

        let entry = self
            .entries
            .get(&parent)
            .ok_or(DocumentError::NodeNotFound(parent))?;
        if !entry.node.is_container() {
            return Err(DocumentError::NotAContainer(parent));
        }
        let len = entry.children.len();
        if index > len {
            return Err(DocumentError::IndexOutOfBounds { parent, index, len });
        }

        self.entries.get_mut(&parent).expect("checked").children.insert(index, child);
        self.entries.get_mut(&child).expect("checked").parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DocumentError> {
        let len = self.children(parent).len();
        self.insert_child_at(parent, len, child)
    }

    /// Insert a detached node as the sibling immediately before `anchor`.
    pub fn insert_before(&mut self, anchor: NodeKey, key: NodeKey) -> Result<(), DocumentError> {
        let parent = self
            .parent(anchor)
            .ok_or(DocumentError::NodeNotFound(anchor))?;
        let index = self.index_in_parent(anchor).expect("anchor is attached");
        self.insert_child_at(parent, index, key)
    }

    /// Insert a detached node as the sibling immediately after `anchor`.
    pub fn insert_after(&mut self, anchor: NodeKey, key: NodeKey) -> Result<(), DocumentError> {
        let parent = self
            .parent(anchor)
            .ok_or(DocumentError::NodeNotFound(anchor))?;
        let index = self.index_in_parent(anchor).expect("anchor is attached");
        self.insert_child_at(parent, index + 1, key)
    }

    /// Unlink a node from its parent. The subtree stays in the arena until
    /// reattached or removed.
    pub fn detach(&mut self, key: NodeKey) -> Result<(), DocumentError> {
        if key == self.root {
            return Err(DocumentError::RootIsPermanent);
        }
        let parent = match self.parent(key) {
            Some(p) => p,
            None => {
                // Already detached; nothing to do.
                if self.contains(key) {
                    return Ok(());
                }
                return Err(DocumentError::NodeNotFound(key));
            }
        };
        self.entries
            .get_mut(&parent)
            .expect("parent exists")
            .children
            .retain(|&c| c != key);
        self.entries.get_mut(&key).expect("checked").parent = None;
        Ok(())
    }

    /// Remove a node and its whole subtree from the arena. Returns the keys
    /// dropped, in document order starting with `key`.
    pub fn remove(&mut self, key: NodeKey) -> Result<Vec<NodeKey>, DocumentError> {
        self.detach(key)?;
        let mut dropped = vec![key];
        dropped.extend(self.descendants(key));
        for k in &dropped {
            self.entries.remove(k);
        }
        Ok(dropped)
    }

    /// Replace a node with its own children, spliced into the parent at the
    /// node's position. Returns the hoisted child keys.
    pub fn splice_out(&mut self, key: NodeKey) -> Result<Vec<NodeKey>, DocumentError> {
        if key == self.root {
            return Err(DocumentError::RootIsPermanent);
        }
        let parent = self.parent(key).ok_or(DocumentError::NodeNotFound(key))?;
        let index = self.index_in_parent(key).expect("attached");

        let children: Vec<NodeKey> = self.children(key).to_vec();
        for &child in &children {
            self.entries.get_mut(&child).expect("child exists").parent = Some(parent);
        }
        {
            let parent_entry = self.entries.get_mut(&parent).expect("parent exists");
            parent_entry.children.splice(index..=index, children.iter().copied());
        }
        self.entries.remove(&key);
        Ok(children)
    }

    /// Replace a node (and its subtree) with a freshly created node at the
    /// same position. Returns the new key.
    pub fn replace_with(&mut self, key: NodeKey, node: Node) -> Result<NodeKey, DocumentError> {
        let parent = self.parent(key).ok_or(DocumentError::NodeNotFound(key))?;
        let index = self.index_in_parent(key).expect("attached");
        self.remove(key)?;
        let new_key = self.create(node);
        self.insert_child_at(parent, index, new_key)?;
        Ok(new_key)
    }

    /// Move every child of `from` to the end of `to`, preserving order.
    pub fn move_children(&mut self, from: NodeKey, to: NodeKey) -> Result<(), DocumentError> {
        let children: Vec<NodeKey> = self.children(from).to_vec();
        for child in children {
            self.detach(child)?;
            self.append_child(to, child)?;
        }
        Ok(())
    }

    /// Ancestors from the immediate parent up to and including the root.
    pub fn ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut cursor = self.parent(key);
        while let Some(k) = cursor {
            out.push(k);
            cursor = self.parent(k);
        }
        out
    }

    /// All descendants of `key` in document (preorder) order, excluding
    /// `key` itself.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(k) = stack.pop() {
            out.push(k);
            stack.extend(self.children(k).iter().rev().copied());
        }
        out
    }

    /// Every node under the root, in document order.
    pub fn walk(&self) -> Vec<NodeKey> {
        self.descendants(self.root)
    }

    pub fn is_ancestor_of(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        self.ancestors(key).contains(&ancestor)
    }

    /// The ancestor of `key` that is a direct child of the root (or `key`
    /// itself if it is one).
    pub fn top_level_ancestor(&self, key: NodeKey) -> Option<NodeKey> {
        if self.parent(key) == Some(self.root) {
            return Some(key);
        }
        let mut cursor = key;
        while let Some(parent) = self.parent(cursor) {
            if parent == self.root {
                return Some(cursor);
            }
            cursor = parent;
        }
        None
    }

    /// Nearest ancestor with the given kind, excluding `key` itself.
    pub fn nearest_ancestor_of_kind(&self, key: NodeKey, kind: NodeKind) -> Option<NodeKey> {
        self.ancestors(key)
            .into_iter()
            .find(|&k| self.kind(k) == Some(kind))
    }

    /// Keys of every node of the given kind, in document order.
    pub fn keys_of_kind(&self, kind: NodeKind) -> Vec<NodeKey> {
        self.walk()
            .into_iter()
            .filter(|&k| self.kind(k) == Some(kind))
            .collect()
    }

    /// Concatenated surface text beneath `key` (Text runs and Word surface
    /// forms, in document order).
    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        if let Some(node) = self.node(key) {
            out.push_str(node.own_text());
        }
        for k in self.descendants(key) {
            if let Some(node) = self.node(k) {
                match node {
                    Node::Text { text } => out.push_str(text),
                    Node::Word { word, .. } => out.push_str(word),
                    _ => {}
                }
            }
        }
        out
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}
