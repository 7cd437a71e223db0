//! Error types for the sync layer

use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Document error: {0}")]
    Document(#[from] glossa_document::DocumentError),

    #[error("Editor error: {0}")]
    Editor(#[from] glossa_editor::EditorError),

    #[error("Remote persistence error: {0}")]
    Remote(#[from] RemoteError),
}
