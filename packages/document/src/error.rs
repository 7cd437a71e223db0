//! Error types for the document model

use crate::key::NodeKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),

    #[error("The root node cannot be detached or removed")]
    RootIsPermanent,

    #[error("Node {0} is already attached to a parent")]
    AlreadyAttached(NodeKey),

    #[error("Node {0} is not a container")]
    NotAContainer(NodeKey),

    #[error("Child index {index} out of bounds for node {parent} with {len} children")]
    IndexOutOfBounds {
        parent: NodeKey,
        index: usize,
        len: usize,
    },

    #[error("Invalid document JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
