//! Queue entry record type.

use mrtrace_types::Statement;
use serde::{Deserialize, Serialize};

use crate::QueueError;

/// A single row from the `statement_queue` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Auto-incremented row ID. Defines the FIFO order.
    pub id: i64,
    /// The statement's own UUID.
    pub statement_id: String,
    /// Verb URI, kept in clear for inspection.
    pub verb_id: String,
    /// Activity URI, kept in clear for inspection.
    pub activity_id: String,
    /// The full statement in its LRS wire form.
    pub payload_json: String,
    /// Number of deterministic rejections seen so far.
    pub attempts: u32,
    /// The last failure recorded for this entry.
    pub last_error: Option<String>,
    /// When the entry was queued.
    pub enqueued_at: String,
}

impl QueueEntry {
    /// Rebuilds the queued statement.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Serialization` if the payload is not a valid
    /// statement.
    pub fn statement(&self) -> Result<Statement, QueueError> {
        Ok(Statement::from_json(&self.payload_json)?)
    }
}
