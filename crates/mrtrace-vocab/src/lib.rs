//! Closed tracing vocabulary and the statement factory.
//!
//! Every statement the tracer sends is built from a verb key and an
//! activity key looked up in a fixed [`Catalog`]. Free-form event names are
//! not accepted: an unknown key is a [`StatementError`] and the statement is
//! never built.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mrtrace_vocab::make_statement;
//!
//! let statement = make_statement(&ctx, "opened", "application", None)?;
//! ```

mod activity;
mod catalog;
mod error;
mod factory;
mod verb;

pub use activity::{ActivityDescriptor, ActivityKey};
pub use catalog::Catalog;
pub use error::StatementError;
pub use factory::make_statement;
pub use verb::{VerbDescriptor, VerbKey};
