//! Durable statement queue.
//!
//! Statements that could not be delivered to the LRS are kept in the
//! `statement_queue` table until a later drain delivers them. The queue is
//! strictly FIFO by insertion and an entry is only deleted once the LRS has
//! confirmed that exact entry.
//!
//! Entries that can never be delivered (an undecodable payload, or an LRS
//! that keeps rejecting them) are moved to `statement_dead_letter` so they
//! do not block the rest of the backlog.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mrtrace_queue::{append, peek_oldest, remove};
//!
//! append(&conn, &statement)?;
//! while let Some(entry) = peek_oldest(&conn)? {
//!     if !deliver(&entry.statement()?).await {
//!         break;
//!     }
//!     remove(&conn, entry.id)?;
//! }
//! ```

mod entry;
mod error;
mod store;

pub use entry::QueueEntry;
pub use error::QueueError;
pub use store::{
    append, dead_letter, dead_letter_count, peek_oldest, queued_count, record_failure, remove,
};

#[cfg(test)]
mod tests;
