//! Pseudonymous student identity.
//!
//! The tracer never sends a student number. It persists a truncated SHA-1
//! digest of it (the "identity hash") and derives the statement actor from
//! that hash. The persisted value is one of:
//!
//! | Value | Meaning |
//! |-------|---------|
//! | `not-initialized` | fresh install, bootstrap has not run yet |
//! | `default` | bootstrap found no usable student number |
//! | 10 hex chars | digest of the student number |

mod store;

pub use store::{get_identity_hash, rotate_identity_hash, set_identity_hash, Rotation};

use mrtrace_types::Actor;
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Sentinel stored before the identity has ever been bootstrapped.
pub const NOT_INITIALIZED: &str = "not-initialized";

/// Placeholder stored when no student number could be discovered.
pub const DEFAULT_IDENTITY: &str = "default";

/// Number of hex characters kept from the SHA-1 digest.
pub const DIGEST_LEN: usize = 10;

/// Length of a student number as found in an OS account name.
pub const STUDENT_NUMBER_LEN: usize = 7;

/// Errors produced by identity persistence.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity row could not be read or written.
    #[error("identity database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The value is neither a known marker nor a digest.
    #[error("invalid identity hash: {0:?}")]
    InvalidHash(String),

    /// The student number to hash was empty.
    #[error("student number cannot be empty")]
    EmptyStudentNumber,
}

/// Hashes a student number into its persisted form.
///
/// Formula: `hash = hex(sha1(student_number))[..10]`
pub fn digest_student_number(student_number: &str) -> String {
    let mut digest = hex::encode(Sha1::digest(student_number.as_bytes()));
    digest.truncate(DIGEST_LEN);
    digest
}

/// Returns `true` if `value` can be stored as an identity hash.
pub fn is_valid_identity_hash(value: &str) -> bool {
    value == NOT_INITIALIZED
        || value == DEFAULT_IDENTITY
        || (value.len() == DIGEST_LEN
            && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
}

/// Extracts a student number from an OS account name.
///
/// Only a purely numeric, seven-digit account name qualifies. The number is
/// normalised through its integer value, so leading zeros are dropped.
pub fn student_number_from_account(account: &str) -> Option<String> {
    if account.len() != STUDENT_NUMBER_LEN || !account.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    account.parse::<u32>().ok().map(|n| n.to_string())
}

/// What the startup bootstrap has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// The identity was set on an earlier run. Nothing to do.
    AlreadyInitialized,
    /// A student number was found and must be rotated in.
    Rotate { student_number: String },
    /// No student number. Persist [`DEFAULT_IDENTITY`].
    Placeholder,
}

/// Decides the bootstrap step from the persisted hash and the OS account.
pub fn plan_bootstrap(current_hash: &str, os_account: Option<&str>) -> Bootstrap {
    if current_hash != NOT_INITIALIZED {
        return Bootstrap::AlreadyInitialized;
    }
    match os_account.and_then(student_number_from_account) {
        Some(student_number) => Bootstrap::Rotate { student_number },
        None => Bootstrap::Placeholder,
    }
}

/// Builds the statement actor for an identity hash.
///
/// The hash is used both as identifier and display name.
pub fn build_actor(hash: &str) -> Actor {
    Actor::from_hash(hash)
}
