//! Error types for statement construction.

/// Errors raised while building a statement.
///
/// Both are caller mistakes. They are logged and the single send is
/// skipped; they never abort the host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatementError {
    /// The verb key is not part of the catalog.
    #[error("missing verb key {0}")]
    UnknownVerb(String),

    /// The activity key is not part of the catalog.
    #[error("missing activity key {0}")]
    UnknownActivity(String),
}
