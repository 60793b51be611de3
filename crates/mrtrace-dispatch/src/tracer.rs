//! Host-facing entry point.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use mrtrace_db::DbPool;
use mrtrace_identity::{
    build_actor, get_identity_hash, plan_bootstrap, rotate_identity_hash, set_identity_hash,
    Bootstrap, Rotation, DEFAULT_IDENTITY, NOT_INITIALIZED,
};
use mrtrace_lrs::RemoteSink;
use mrtrace_types::{ext, Extensions, SessionId, TraceContext};
use mrtrace_vocab::{make_statement, ActivityKey, VerbKey};

use crate::dispatcher::with_conn;
use crate::report::{plan_evaluation, plan_execution, ProgrammingMode, Report, TraceEvent};
use crate::{DeliverySettings, Dispatcher, DrainReport};

/// Builds statements for the current identity and session and hands them
/// to the [`Dispatcher`].
///
/// The context is immutable. Rotating the identity swaps in a new one, so a
/// statement keeps the actor that was current when it was built. The first
/// context is built after the identity bootstrap, so no statement carries
/// the uninitialized sentinel.
pub struct Tracer<S: RemoteSink> {
    dispatcher: Dispatcher<S>,
    pool: DbPool,
    context: RwLock<Arc<TraceContext>>,
}

/// Identity in effect once [`bootstrap_identity`] has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrappedIdentity {
    pub hash: String,
    /// Set when the bootstrap rotated in a student number. The rotation
    /// statement has not been sent yet.
    pub rotation: Option<Rotation>,
}

/// Sets the persisted identity on a fresh install.
///
/// Does nothing once an identity has been persisted. A seven-digit
/// `os_account` is rotated in as the student number; anything else stores
/// the placeholder. Storage failures are logged and leave the identity
/// that could be read (or the sentinel) in place.
pub async fn bootstrap_identity(pool: &DbPool, os_account: Option<&str>) -> BootstrappedIdentity {
    let current = match with_conn(pool, get_identity_hash).await {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "failed to read identity, bootstrap aborted");
            return BootstrappedIdentity {
                hash: NOT_INITIALIZED.to_string(),
                rotation: None,
            };
        }
    };

    match plan_bootstrap(&current, os_account) {
        Bootstrap::AlreadyInitialized => {
            tracing::debug!(identity = %current, "identity already initialized");
            BootstrappedIdentity {
                hash: current,
                rotation: None,
            }
        }
        Bootstrap::Rotate { student_number } => {
            match with_conn(pool, move |conn| rotate_identity_hash(conn, &student_number)).await {
                Ok(rotation) => BootstrappedIdentity {
                    hash: rotation.new_hash.clone(),
                    rotation: Some(rotation),
                },
                Err(e) => {
                    tracing::error!(error = %e, "identity rotation failed");
                    BootstrappedIdentity {
                        hash: current,
                        rotation: None,
                    }
                }
            }
        }
        Bootstrap::Placeholder => {
            match with_conn(pool, |conn| set_identity_hash(conn, DEFAULT_IDENTITY)).await {
                Ok(()) => {
                    tracing::info!("no student number found, using placeholder identity");
                    BootstrappedIdentity {
                        hash: DEFAULT_IDENTITY.to_string(),
                        rotation: None,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to store placeholder identity");
                    BootstrappedIdentity {
                        hash: current,
                        rotation: None,
                    }
                }
            }
        }
    }
}

impl<S: RemoteSink> Tracer<S> {
    /// Bootstraps the identity, then opens a tracing session with it.
    ///
    /// `os_account` is the login name of the user running the IDE. A
    /// seven-digit account name is taken as the student number.
    pub async fn start(
        pool: DbPool,
        sink: S,
        settings: DeliverySettings,
        os_account: Option<&str>,
    ) -> Self {
        let BootstrappedIdentity { hash, rotation } = bootstrap_identity(&pool, os_account).await;

        let context = TraceContext::new(build_actor(&hash), SessionId::generate());
        tracing::info!(session = %context.session_id, identity = %hash, "tracing session opened");

        let tracer = Self {
            dispatcher: Dispatcher::start(pool.clone(), sink, settings),
            pool,
            context: RwLock::new(Arc::new(context)),
        };
        if let Some(rotation) = rotation {
            tracer.emit_rotation(&rotation);
        }
        tracer
    }

    /// Snapshot of the context new statements are built with.
    pub fn context(&self) -> Arc<TraceContext> {
        Arc::clone(&self.context.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn replace_context(&self, context: TraceContext) {
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(context);
    }

    /// Builds a statement and submits it for delivery.
    ///
    /// Unknown keys are logged and the statement is dropped.
    pub fn emit(&self, verb: &str, activity: &str, extensions: Option<Extensions>) {
        let context = self.context();
        match make_statement(&context, verb, activity, extensions) {
            Ok(statement) => self.dispatcher.submit(statement),
            Err(e) => tracing::warn!(error = %e, verb, activity, "statement not sent"),
        }
    }

    pub fn emit_event(&self, event: &TraceEvent) {
        self.emit(
            event.verb.as_str(),
            event.activity.as_str(),
            Some(event.extensions.clone()),
        );
    }

    /// Replaces the identity with the digest of `student_number`.
    ///
    /// The new actor is swapped in first, so the `updated`/`student-number`
    /// statement carrying both hashes is already sent under it.
    pub async fn rotate_identity(&self, student_number: &str) {
        let source = student_number.to_string();
        let rotation = match with_conn(&self.pool, move |conn| rotate_identity_hash(conn, &source))
            .await
        {
            Ok(rotation) => rotation,
            Err(e) => {
                tracing::error!(error = %e, "identity rotation failed");
                return;
            }
        };

        self.replace_context(self.context().with_actor(build_actor(&rotation.new_hash)));
        self.emit_rotation(&rotation);
    }

    fn emit_rotation(&self, rotation: &Rotation) {
        self.emit(
            VerbKey::Updated.as_str(),
            ActivityKey::StudentNumber.as_str(),
            Some(
                Extensions::new()
                    .with(ext::OLD_HASH, rotation.old_hash.as_str())
                    .with(ext::NEW_HASH, rotation.new_hash.as_str()),
            ),
        );
    }

    /// Traces the findings and outcome of running a file.
    ///
    /// The source is decoded leniently: bytes that are not UTF-8 are
    /// replaced, the other characters of the line are kept. An unreadable
    /// file only loses the line text of the findings.
    pub fn record_execution(&self, report: &Report, mode: ProgrammingMode, path: &Path) {
        let source = match std::fs::read(path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to read executed file");
                None
            }
        };
        let filename = path.to_string_lossy();
        for event in plan_execution(report, mode, &filename, source.as_deref()) {
            self.emit_event(&event);
        }
    }

    /// Traces the findings and outcome of evaluating one instruction.
    pub fn record_evaluation(&self, report: &Report, mode: ProgrammingMode, instruction: &str) {
        for event in plan_evaluation(report, mode, instruction) {
            self.emit_event(&event);
        }
    }

    /// See [`Dispatcher::drain_queue`].
    pub async fn drain_queue(&self) -> DrainReport {
        self.dispatcher.drain_queue().await
    }

    /// Closes the session, waiting for statements already handed to the
    /// workers.
    pub async fn shutdown(self) {
        tracing::info!(session = %self.context().session_id, "closing tracing session");
        self.dispatcher.shutdown().await;
    }
}
