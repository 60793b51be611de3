//! Internal error type for background storage work.

use thiserror::Error;

/// Failures of the local storage side of delivery.
///
/// These never reach the host. They are logged where they occur.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No connection could be taken from the pool.
    #[error("failed to get a database connection: {0}")]
    Pool(#[from] r2d2::Error),

    /// A queue operation failed.
    #[error(transparent)]
    Queue(#[from] mrtrace_queue::QueueError),

    /// Reading or writing the persisted identity failed.
    #[error(transparent)]
    Identity(#[from] mrtrace_identity::IdentityError),

    /// The blocking task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
