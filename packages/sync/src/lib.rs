//! # Glossa Sync
//!
//! Outline tracking and remote synchronization for glossa documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ session: one open document                  │
//! │  - editor transactions                      │
//! │  - snapshot diff → outline index            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ outline: tracked entities, dirty/deleted    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ reconcile: minimal upserts + batched deletes│
//! │ against a PersistenceService (HTTP or fake) │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Best-effort sync**: editing never blocks on the network; failures
//!    stay dirty and retry next cycle
//! 2. **Minimal writes**: snapshot-equal updates never reach the wire
//! 3. **Session-owned state**: no globals; open, edit, save, tear down

mod error;
pub mod fake;
mod http;
mod outline;
mod reconcile;
mod remote;
mod session;

pub use error::SyncError;
pub use http::HttpPersistenceService;
pub use outline::{
    extract_snapshots, Entry, GrammarPointSnapshot, OutlineIndex, SentenceSnapshot,
    TrackedSnapshots, WordSnapshot,
};
pub use reconcile::{EntityKind, ReconcileFailure, ReconcileReport};
pub use remote::{
    join_translations, split_translations, DocumentUpsert, GrammarPointRecord, GrammarPointUpsert,
    PersistenceService, RemoteError, RemoteErrorKind, RemoteResult, SentenceRecord, SentenceUpsert,
    WordRecord, WordUpsert,
};
pub use session::{DocumentMeta, DocumentSession};
