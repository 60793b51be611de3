//! Persistence of the identity hash in the `student_identity` table.

use rusqlite::{params, Connection, OptionalExtension};

use crate::{digest_student_number, is_valid_identity_hash, IdentityError, NOT_INITIALIZED};

/// Old and new hash of a rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub old_hash: String,
    pub new_hash: String,
}

/// Reads the persisted identity hash.
///
/// Returns [`NOT_INITIALIZED`] when nothing has been stored yet.
///
/// # Errors
///
/// Returns `IdentityError::Database` on SQL failure.
pub fn get_identity_hash(conn: &Connection) -> Result<String, IdentityError> {
    let hash: Option<String> = conn
        .query_row("SELECT hash FROM student_identity WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(hash.unwrap_or_else(|| NOT_INITIALIZED.to_string()))
}

/// Replaces the persisted identity hash.
///
/// # Errors
///
/// Returns `IdentityError::InvalidHash` if `hash` is not a marker or a
/// digest, or `IdentityError::Database` on SQL failure.
pub fn set_identity_hash(conn: &Connection, hash: &str) -> Result<(), IdentityError> {
    if !is_valid_identity_hash(hash) {
        return Err(IdentityError::InvalidHash(hash.to_string()));
    }
    conn.execute(
        "INSERT INTO student_identity (id, hash, updated_at) VALUES (1, ?1, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET hash = excluded.hash, updated_at = excluded.updated_at",
        params![hash],
    )?;
    Ok(())
}

/// Hashes `student_number` and persists it, returning both hashes.
///
/// The read of the old hash and the write of the new one happen in one
/// transaction.
///
/// # Errors
///
/// Returns `IdentityError::EmptyStudentNumber` for an empty input, or
/// `IdentityError::Database` on SQL failure.
pub fn rotate_identity_hash(
    conn: &Connection,
    student_number: &str,
) -> Result<Rotation, IdentityError> {
    if student_number.is_empty() {
        return Err(IdentityError::EmptyStudentNumber);
    }
    let new_hash = digest_student_number(student_number);

    let tx = conn.unchecked_transaction()?;
    let old_hash = get_identity_hash(&tx)?;
    set_identity_hash(&tx, &new_hash)?;
    tx.commit()?;

    tracing::info!(%old_hash, %new_hash, "rotated identity hash");

    Ok(Rotation { old_hash, new_hash })
}
