//! Error types for the durable queue.

/// Errors that can occur during queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// A database operation failed.
    #[error("queue database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A statement could not be encoded or a stored payload decoded.
    #[error("queue serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
