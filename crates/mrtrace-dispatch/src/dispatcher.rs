//! Live delivery and backlog draining.
//!
//! Live statements go through a bounded channel served by a fixed set of
//! worker tasks. A worker that fails to deliver a statement appends it to
//! the durable queue. When the channel is full the statement goes straight
//! to the queue, so a burst of events never spawns unbounded work.
//!
//! Statements delivered by different workers may reach the LRS in any
//! order. The queue, on the other hand, is drained by one routine at a
//! time, front to back.

use std::sync::Arc;

use mrtrace_db::DbPool;
use mrtrace_lrs::{RemoteSink, SaveReceipt, SinkError};
use mrtrace_types::Statement;
use rusqlite::Connection;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::{DeliverySettings, DispatchError};

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every entry was delivered or dead-lettered.
    Emptied,
    /// Delivery or storage failed; the remaining entries stay queued.
    Stalled,
    /// Another drain was in progress. Nothing was done.
    AlreadyRunning,
}

/// Summary of one [`Dispatcher::drain_queue`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub dead_lettered: usize,
    pub outcome: DrainOutcome,
}

impl DrainReport {
    fn new() -> Self {
        Self {
            delivered: 0,
            dead_lettered: 0,
            outcome: DrainOutcome::Emptied,
        }
    }
}

struct Shared<S> {
    sink: S,
    pool: DbPool,
    settings: DeliverySettings,
    drain_lock: Mutex<()>,
}

/// Background delivery of statements to a [`RemoteSink`].
pub struct Dispatcher<S: RemoteSink> {
    shared: Arc<Shared<S>>,
    tx: mpsc::Sender<Statement>,
    workers: Vec<JoinHandle<()>>,
}

impl<S: RemoteSink> Dispatcher<S> {
    /// Starts the worker pool.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(pool: DbPool, sink: S, settings: DeliverySettings) -> Self {
        let worker_count = settings.workers.max(1);
        let (tx, rx) = mpsc::channel::<Statement>(settings.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let shared = Arc::new(Shared {
            sink,
            pool,
            settings,
            drain_lock: Mutex::new(()),
        });

        let workers = (0..worker_count)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                let rx = Arc::clone(&rx);
                tokio::spawn(worker_task(worker_id, shared, rx))
            })
            .collect();

        tracing::info!(
            workers = worker_count,
            queue_capacity = settings.queue_capacity,
            "started statement dispatcher"
        );

        Self {
            shared,
            tx,
            workers,
        }
    }

    /// Hands a statement over for delivery without waiting on the network.
    ///
    /// If every worker is busy and the channel is full, the statement is
    /// appended to the durable queue on the calling thread instead.
    pub fn submit(&self, statement: Statement) {
        let statement = match self.tx.try_send(statement) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(statement)) => {
                tracing::warn!(
                    statement_id = %statement.id(),
                    "delivery channel full, queueing statement for later"
                );
                statement
            }
            Err(mpsc::error::TrySendError::Closed(statement)) => {
                tracing::warn!(
                    statement_id = %statement.id(),
                    "dispatcher stopped, queueing statement for later"
                );
                statement
            }
        };

        let result = self
            .shared
            .pool
            .get()
            .map_err(DispatchError::from)
            .and_then(|conn| Ok(mrtrace_queue::append(&conn, &statement)?));
        if let Err(e) = result {
            tracing::error!(error = %e, statement_id = %statement.id(), "failed to queue statement");
        }
    }

    /// Replays the durable queue, oldest entry first.
    ///
    /// Stops at the first entry that cannot be delivered, leaving it and
    /// everything behind it queued. Entries that can never be delivered are
    /// dead-lettered so they do not block the backlog:
    ///
    /// - an entry whose payload does not decode;
    /// - an entry rejected deterministically `max_rejections` times.
    pub async fn drain_queue(&self) -> DrainReport {
        let Ok(_guard) = self.shared.drain_lock.try_lock() else {
            tracing::debug!("queue drain already in progress");
            return DrainReport {
                outcome: DrainOutcome::AlreadyRunning,
                ..DrainReport::new()
            };
        };

        let mut report = DrainReport::new();
        let pool = &self.shared.pool;

        loop {
            let entry = match with_conn(pool, mrtrace_queue::peek_oldest).await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read statement queue");
                    report.outcome = DrainOutcome::Stalled;
                    break;
                }
            };
            let entry_id = entry.id;

            let statement = match entry.statement() {
                Ok(statement) => statement,
                Err(e) => {
                    let reason = format!("undecodable payload: {e}");
                    if !self.dead_letter(entry_id, reason, &mut report).await {
                        break;
                    }
                    continue;
                }
            };

            match deliver(&self.shared.sink, &statement).await {
                Ok(_) => {
                    let removed =
                        with_conn(pool, move |conn| mrtrace_queue::remove(conn, entry_id)).await;
                    if let Err(e) = removed {
                        // Still queued; resent by the next drain.
                        tracing::error!(error = %e, entry_id, "failed to remove delivered statement");
                        report.outcome = DrainOutcome::Stalled;
                        break;
                    }
                    report.delivered += 1;
                }
                Err(e) if e.is_deterministic() => {
                    let message = e.to_string();
                    let attempts = match with_conn(pool, move |conn| {
                        mrtrace_queue::record_failure(conn, entry_id, &message)
                    })
                    .await
                    {
                        Ok(attempts) => attempts,
                        Err(e) => {
                            tracing::error!(error = %e, entry_id, "failed to record rejection");
                            report.outcome = DrainOutcome::Stalled;
                            break;
                        }
                    };

                    if attempts < self.shared.settings.max_rejections {
                        report.outcome = DrainOutcome::Stalled;
                        break;
                    }
                    let reason = format!("rejected {attempts} times: {e}");
                    if !self.dead_letter(entry_id, reason, &mut report).await {
                        break;
                    }
                }
                Err(_) => {
                    report.outcome = DrainOutcome::Stalled;
                    break;
                }
            }
        }

        tracing::info!(
            delivered = report.delivered,
            dead_lettered = report.dead_lettered,
            outcome = ?report.outcome,
            "statement queue drain finished"
        );
        report
    }

    /// Returns `false` (and marks the drain stalled) if the move failed.
    async fn dead_letter(&self, entry_id: i64, reason: String, report: &mut DrainReport) -> bool {
        match with_conn(&self.shared.pool, move |conn| {
            mrtrace_queue::dead_letter(conn, entry_id, &reason)
        })
        .await
        {
            Ok(_) => {
                report.dead_lettered += 1;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, entry_id, "failed to dead-letter statement");
                report.outcome = DrainOutcome::Stalled;
                false
            }
        }
    }

    /// Stops accepting statements and waits for the workers to finish the
    /// ones already handed over.
    pub async fn shutdown(self) {
        let Self { tx, workers, .. } = self;
        drop(tx);
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "delivery worker failed");
            }
        }
        tracing::info!("statement dispatcher stopped");
    }
}

async fn worker_task<S: RemoteSink>(
    worker_id: usize,
    shared: Arc<Shared<S>>,
    rx: Arc<Mutex<mpsc::Receiver<Statement>>>,
) {
    loop {
        let statement = {
            let mut rx = rx.lock().await;
            match rx.recv().await {
                Some(statement) => statement,
                None => break,
            }
        };

        if deliver(&shared.sink, &statement).await.is_ok() {
            continue;
        }

        let queued =
            with_conn(&shared.pool, move |conn| mrtrace_queue::append(conn, &statement)).await;
        if let Err(e) = queued {
            tracing::error!(error = %e, worker_id, "failed to queue undelivered statement");
        }
    }
    tracing::debug!(worker_id, "delivery worker shutting down");
}

/// One delivery attempt, with the outcome logged.
async fn deliver<S: RemoteSink>(sink: &S, statement: &Statement) -> Result<SaveReceipt, SinkError> {
    let result = sink.save(statement).await;
    match &result {
        Ok(receipt) => {
            tracing::debug!(
                statement_id = %statement.id(),
                detail = %receipt.detail,
                "statement delivered to the LRS"
            );
        }
        Err(SinkError::Transport(e)) => {
            tracing::warn!(statement_id = %statement.id(), error = %e, "couldn't connect to the LRS");
        }
        Err(SinkError::Rejected { status, detail }) => {
            tracing::warn!(
                statement_id = %statement.id(),
                status,
                detail = %detail,
                "statement rejected by the LRS"
            );
        }
    }
    result
}

/// Runs a storage operation on the blocking pool.
pub(crate) async fn with_conn<T, E, F>(pool: &DbPool, op: F) -> Result<T, DispatchError>
where
    T: Send + 'static,
    E: Into<DispatchError>,
    F: FnOnce(&Connection) -> Result<T, E> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<T, DispatchError> {
        let conn = pool.get()?;
        op(&conn).map_err(Into::into)
    })
    .await?
}
