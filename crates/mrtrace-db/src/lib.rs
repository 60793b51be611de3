//! Local storage for the mrtrace pipeline.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. Both the persisted identity hash and the
//! durable statement queue live in the single database file managed here.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: one local file on the student machine, no
//!   external process. Committed rows survive a crash of the host process,
//!   which is what the durable queue relies on.
//! - **`r2d2` connection pool**: delivery workers and the drain routine each
//!   borrow a connection from a bounded pool.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the code that reads it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
