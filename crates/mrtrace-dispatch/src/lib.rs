//! Statement delivery for the mrtrace pipeline.
//!
//! [`Tracer`] is the entry point for the host IDE. It owns the current
//! [`TraceContext`](mrtrace_types::TraceContext), builds statements from
//! vocabulary keys and hands them to the [`Dispatcher`], which delivers them
//! to the LRS in the background and falls back to the durable queue when
//! delivery fails. The backlog is replayed by [`Dispatcher::drain_queue`].
//!
//! Nothing here returns an error to the host: every failure is logged and
//! the host keeps running.

mod dispatcher;
mod error;
pub mod report;
mod settings;
mod tracer;

pub use dispatcher::{Dispatcher, DrainOutcome, DrainReport};
pub use error::DispatchError;
pub use report::{ErrorClass, Finding, ProgrammingMode, Report, Severity, TraceEvent};
pub use settings::DeliverySettings;
pub use tracer::{bootstrap_identity, BootstrappedIdentity, Tracer};
