//! # Glossa Editor
//!
//! Command handling and structural normalization for glossa documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: node variants + arena tree        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: transactions                        │
//! │  - commands mutate the tree                 │
//! │  - transforms re-normalize after each one   │
//! │  - selection follows the edit               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ sync: outline index + reconciliation        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Commands fall through**: a handler whose preconditions fail returns
//!    `NotHandled` instead of erroring, so the host engine keeps its default
//!    behavior for that dispatch
//! 2. **Repair beats rejection**: structural violations after an edit are
//!    silently fixed by the transform sweep, never surfaced
//! 3. **One writer**: all tree mutation goes through [`Editor::apply`]
//!    transactions

mod commands;
mod editor;
mod errors;
pub mod popup;
pub mod selection;
pub mod transforms;

pub use commands::{Command, Outcome};
pub use editor::{Editor, EditorSettings};
pub use errors::EditorError;
pub use selection::{Point, Selection};
