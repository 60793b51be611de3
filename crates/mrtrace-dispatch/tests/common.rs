//! Shared fixtures for the dispatcher and tracer tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mrtrace_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use mrtrace_lrs::{RemoteSink, SaveReceipt, SinkError};
use mrtrace_types::{Actor, SessionId, Statement, TraceContext};
use mrtrace_vocab::make_statement;
use tempfile::TempDir;
use tokio::sync::watch;

/// How a [`RecordingSink`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Accept,
    /// Behaves like an unreachable LRS.
    Refuse,
    /// Answers with the given HTTP status.
    Reject(u16),
    /// Waits for [`RecordingSink::release`], then accepts.
    Hang,
}

struct Inner {
    mode: Mutex<SinkMode>,
    delivered: Mutex<Vec<Statement>>,
    attempts: AtomicUsize,
    gate: watch::Sender<bool>,
}

/// In-process sink that records what it stores.
#[derive(Clone)]
pub struct RecordingSink {
    inner: Arc<Inner>,
}

impl RecordingSink {
    pub fn new(mode: SinkMode) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                mode: Mutex::new(mode),
                delivered: Mutex::new(Vec::new()),
                attempts: AtomicUsize::new(0),
                gate,
            }),
        }
    }

    pub fn set_mode(&self, mode: SinkMode) {
        *self.inner.mode.lock().expect("mode lock") = mode;
    }

    /// Lets every hanging save through.
    pub fn release(&self) {
        self.inner.gate.send_replace(true);
    }

    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<Statement> {
        self.inner.delivered.lock().expect("delivered lock").clone()
    }

    /// Polls until `attempts() >= n`.
    pub async fn wait_for_attempts(&self, n: usize) {
        for _ in 0..500 {
            if self.attempts() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("sink saw {} attempts, expected {n}", self.attempts());
    }

    fn record(&self, statement: &Statement) -> SaveReceipt {
        self.inner
            .delivered
            .lock()
            .expect("delivered lock")
            .push(statement.clone());
        SaveReceipt {
            detail: format!("[\"{}\"]", statement.id()),
        }
    }
}

impl RemoteSink for RecordingSink {
    async fn save(&self, statement: &Statement) -> Result<SaveReceipt, SinkError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        let mode = *self.inner.mode.lock().expect("mode lock");
        match mode {
            SinkMode::Accept => Ok(self.record(statement)),
            SinkMode::Refuse => Err(SinkError::Transport("connection refused".to_string())),
            SinkMode::Reject(status) => Err(SinkError::Rejected {
                status,
                detail: "invalid statement".to_string(),
            }),
            SinkMode::Hang => {
                let mut open = self.inner.gate.subscribe();
                open.wait_for(|open| *open).await.expect("gate sender alive");
                Ok(self.record(statement))
            }
        }
    }
}

/// A migrated database in a temporary directory.
///
/// File-backed so every pooled connection sees the same data. Keep the
/// directory alive for as long as the pool is used.
pub fn test_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let pool = pool_at(&dir);
    (dir, pool)
}

/// Opens (or reopens) the database in `dir`.
pub fn pool_at(dir: &TempDir) -> DbPool {
    let path = dir.path().join("mrtrace.db");
    let pool = create_pool(
        path.to_str().expect("temp path is utf-8"),
        DbRuntimeSettings::default(),
    )
    .expect("pool creation should succeed");
    let conn = pool.get().expect("connection should succeed");
    run_migrations(&conn).expect("migrations should succeed");
    pool
}

pub fn statement(verb: &str, activity: &str) -> Statement {
    let ctx = TraceContext::new(Actor::from_hash("20eabe5d64"), SessionId::from("5e55105e55"));
    make_statement(&ctx, verb, activity, None).expect("known keys")
}

pub fn queued(pool: &DbPool) -> u64 {
    let conn = pool.get().expect("connection");
    mrtrace_queue::queued_count(&conn).expect("count")
}

pub fn dead_lettered(pool: &DbPool) -> u64 {
    let conn = pool.get().expect("connection");
    mrtrace_queue::dead_letter_count(&conn).expect("count")
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// A plain-text subscriber writing into this capture.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish()
    }

    pub fn lines(&self) -> Vec<String> {
        let buf = self.buf.lock().expect("log lock");
        String::from_utf8_lossy(&buf).lines().map(str::to_string).collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().expect("log lock").extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
