//! # Glossa Document
//!
//! Tree document model for annotated language-learning documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ node: closed set of node variants           │
//! │  - annotation nodes (Word, Sentence, ...)   │
//! │  - structural predicates per variant        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ tree: arena of nodes keyed by NodeKey       │
//! │  - children owned as ordered key lists      │
//! │  - parent as back-reference, never ownership│
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serialize: tree ⇄ JSON document             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is source of truth**: indexes and persisted rows are derived
//! 2. **Keys are session-local**: persisted identity travels separately as
//!    `database_id` on the nodes that have one
//! 3. **Documents always open**: malformed node data degrades to defaults,
//!    unknown node types become opaque placeholders

mod error;
mod key;
mod node;
mod serialize;
mod tree;

pub use error::DocumentError;
pub use key::{KeyGenerator, NodeKey};
pub use node::{Node, NodeKind};
pub use serialize::{deserialize_document, deserialize_str, serialize_document, serialize_string};
pub use tree::DocumentTree;
