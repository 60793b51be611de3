//! Persistence operations for the statement queue.
//!
//! Every function takes a plain connection and performs one short,
//! self-contained write or read. Callers on an async runtime run them on
//! the blocking pool.

use mrtrace_types::Statement;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::entry::QueueEntry;
use crate::error::QueueError;

const ENTRY_COLUMNS: &str = "id, statement_id, verb_id, activity_id, payload_json, attempts, last_error, enqueued_at";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        statement_id: row.get(1)?,
        verb_id: row.get(2)?,
        activity_id: row.get(3)?,
        payload_json: row.get(4)?,
        attempts: row.get(5)?,
        last_error: row.get(6)?,
        enqueued_at: row.get(7)?,
    })
}

/// Appends a statement at the back of the queue.
///
/// The entry is durable once this returns `Ok`.
///
/// # Errors
///
/// Returns `QueueError::Serialization` if the statement cannot be encoded
/// or `QueueError::Database` on SQL failure.
pub fn append(conn: &Connection, statement: &Statement) -> Result<QueueEntry, QueueError> {
    let payload_json = statement.to_json()?;

    let entry = conn.query_row(
        &format!(
            "INSERT INTO statement_queue (statement_id, verb_id, activity_id, payload_json)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {ENTRY_COLUMNS}"
        ),
        params![
            statement.id().to_string(),
            statement.verb().id,
            statement.object().id,
            payload_json,
        ],
        entry_from_row,
    )?;

    tracing::debug!(entry_id = entry.id, statement_id = %entry.statement_id, "queued statement");

    Ok(entry)
}

/// Returns the oldest entry without removing it.
///
/// # Errors
///
/// Returns `QueueError::Database` on SQL failure.
pub fn peek_oldest(conn: &Connection) -> Result<Option<QueueEntry>, QueueError> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM statement_queue ORDER BY id ASC LIMIT 1"),
            [],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Removes the entry with the given id.
///
/// Returns `false` if no such entry exists (already removed).
///
/// # Errors
///
/// Returns `QueueError::Database` on SQL failure.
pub fn remove(conn: &Connection, id: i64) -> Result<bool, QueueError> {
    let deleted = conn.execute("DELETE FROM statement_queue WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Records a failed delivery attempt and returns the new attempt count.
///
/// Returns `0` if the entry no longer exists.
///
/// # Errors
///
/// Returns `QueueError::Database` on SQL failure.
pub fn record_failure(conn: &Connection, id: i64, error: &str) -> Result<u32, QueueError> {
    let attempts = conn
        .query_row(
            "UPDATE statement_queue SET attempts = attempts + 1, last_error = ?2
             WHERE id = ?1
             RETURNING attempts",
            params![id, error],
            |row| row.get(0),
        )
        .optional()?;
    Ok(attempts.unwrap_or(0))
}

/// Moves an entry out of the queue into the dead-letter table.
///
/// The copy and the delete happen in one transaction. Returns `false` if
/// the entry no longer exists.
///
/// # Errors
///
/// Returns `QueueError::Database` on SQL failure.
pub fn dead_letter(conn: &Connection, id: i64, reason: &str) -> Result<bool, QueueError> {
    let tx = conn.unchecked_transaction()?;
    let copied = tx.execute(
        "INSERT INTO statement_dead_letter (queue_id, payload_json, reason)
         SELECT id, payload_json, ?2 FROM statement_queue WHERE id = ?1",
        params![id, reason],
    )?;
    tx.execute("DELETE FROM statement_queue WHERE id = ?1", params![id])?;
    tx.commit()?;

    if copied > 0 {
        tracing::warn!(entry_id = id, reason, "moved statement to dead-letter table");
    }
    Ok(copied > 0)
}

/// Number of entries waiting in the queue.
///
/// # Errors
///
/// Returns `QueueError::Database` on SQL failure.
pub fn queued_count(conn: &Connection) -> Result<u64, QueueError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM statement_queue", [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Number of entries in the dead-letter table.
///
/// # Errors
///
/// Returns `QueueError::Database` on SQL failure.
pub fn dead_letter_count(conn: &Connection) -> Result<u64, QueueError> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM statement_dead_letter", [], |row| row.get(0))?;
    Ok(count as u64)
}
