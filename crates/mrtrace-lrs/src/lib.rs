//! The Learning Record Store boundary.
//!
//! The dispatcher only knows the [`RemoteSink`] trait: hand over one
//! statement, get back a receipt or a [`SinkError`]. [`LrsClient`] is the
//! production sink that speaks the xAPI statements resource over HTTP.
//! Tests and hosts may plug in any other implementation.

mod client;
mod config;

pub use client::{LrsClient, LrsError};
pub use config::LrsConfig;

use std::future::Future;

use mrtrace_types::Statement;
use thiserror::Error;

/// Successful save, with whatever the LRS sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Response body; for xAPI the list of stored statement ids.
    pub detail: String,
}

/// Why a statement was not stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The LRS could not be reached (connection refused, DNS, timeout).
    #[error("could not connect to the LRS: {0}")]
    Transport(String),

    /// The LRS answered but did not store the statement.
    #[error("statement rejected by the LRS (status {status}): {detail}")]
    Rejected {
        /// HTTP status returned by the LRS.
        status: u16,
        /// Response body, as sent by the LRS.
        detail: String,
    },
}

impl SinkError {
    /// `true` when resending the same statement will fail the same way.
    ///
    /// Client errors are deterministic, except request timeout (408) and
    /// rate limiting (429).
    pub fn is_deterministic(&self) -> bool {
        match self {
            Self::Transport(_) => false,
            Self::Rejected { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
        }
    }
}

/// Anything a statement can be delivered to.
pub trait RemoteSink: Send + Sync + 'static {
    /// Attempts to store one statement.
    fn save(
        &self,
        statement: &Statement,
    ) -> impl Future<Output = Result<SaveReceipt, SinkError>> + Send;
}
