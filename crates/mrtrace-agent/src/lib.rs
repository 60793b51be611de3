//! The mrtrace delivery agent.
//!
//! Opens the local trace database, bootstraps the student identity and
//! replays statements that could not be delivered during earlier sessions.
//! With a drain interval configured it keeps replaying the backlog until it
//! receives SIGINT or SIGTERM.

pub mod background;
pub mod config;

use std::future::Future;
use std::sync::Arc;

use mrtrace_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings, MigrationError, PoolError};
use mrtrace_dispatch::{DrainReport, Tracer};
use mrtrace_lrs::{LrsClient, LrsError, RemoteSink};
use thiserror::Error;

use crate::config::{Config, ConfigError};

/// Startup failures. Once the tracer is running nothing is fatal.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to get database connection for migrations: {0}")]
    Connection(#[from] r2d2::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Lrs(#[from] LrsError),
}

/// Opens the database and applies pending migrations.
///
/// # Errors
///
/// Returns `AgentError` if the pool cannot be created or a migration fails.
pub fn open_database(config: &Config) -> Result<DbPool, AgentError> {
    let pool = create_pool(
        &config.database.path,
        DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )?;

    let conn = pool.get()?;
    let applied = run_migrations(&conn)?;
    if applied > 0 {
        tracing::info!(count = applied, "applied database migrations");
    }
    drop(conn);

    Ok(pool)
}

/// Login name of the user running the agent.
pub fn os_account() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
}

/// Starts a tracer on `sink`, drains the backlog once, then keeps draining
/// on the configured interval until `shutdown` resolves.
///
/// Returns the report of the startup drain.
pub async fn run_with_sink<S, F>(
    config: &Config,
    pool: DbPool,
    sink: S,
    os_account: Option<&str>,
    shutdown: F,
) -> DrainReport
where
    S: RemoteSink,
    F: Future<Output = ()>,
{
    let tracer = Arc::new(Tracer::start(pool, sink, config.delivery.settings, os_account).await);

    let report = tracer.drain_queue().await;

    background::run_drain_task(
        Arc::clone(&tracer),
        config.delivery.drain_interval_seconds,
        shutdown,
    )
    .await;

    match Arc::into_inner(tracer) {
        Some(tracer) => tracer.shutdown().await,
        None => tracing::warn!("tracer still shared at exit, skipping clean shutdown"),
    }
    report
}

/// Runs the agent against the configured LRS.
///
/// # Errors
///
/// Returns `AgentError` if startup fails.
pub async fn run<F>(config: Config, shutdown: F) -> Result<DrainReport, AgentError>
where
    F: Future<Output = ()>,
{
    let pool = open_database(&config)?;
    let client = LrsClient::new(config.lrs.clone())?;
    tracing::info!(endpoint = %config.lrs.endpoint, "delivering statements to LRS");

    let account = os_account();
    Ok(run_with_sink(&config, pool, client, account.as_deref(), shutdown).await)
}
