//! Statement construction.

use mrtrace_types::{Context, Extensions, Statement, TraceContext};

use crate::{Catalog, StatementError};

/// Builds a statement for `ctx` from a verb key and an activity key.
///
/// Extensions, when given, are attached to a fresh copy of the activity
/// definition. The context always carries the session id. No I/O happens
/// here.
///
/// # Errors
///
/// Returns `StatementError::UnknownVerb` or `StatementError::UnknownActivity`
/// when a key is not in the catalog. The verb is checked first.
pub fn make_statement(
    ctx: &TraceContext,
    verb_key: &str,
    activity_key: &str,
    extensions: Option<Extensions>,
) -> Result<Statement, StatementError> {
    let catalog = Catalog::global();
    let verb = catalog.verb(verb_key)?;
    let activity = catalog.activity(activity_key)?;

    Ok(Statement::new(
        ctx.actor.clone(),
        verb.to_verb(),
        activity.to_activity(extensions),
        Context::for_session(&ctx.session_id),
    ))
}
