//! Periodic replay of the statement queue.

use std::future::Future;
use std::sync::Arc;

use mrtrace_dispatch::{DrainOutcome, Tracer};
use mrtrace_lrs::RemoteSink;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Drains the queue every `interval_seconds` until `shutdown` resolves.
///
/// Returns immediately when the interval is 0. A drain that overlaps a
/// still-running one is skipped.
pub async fn run_drain_task<S, F>(tracer: Arc<Tracer<S>>, interval_seconds: u64, shutdown: F)
where
    S: RemoteSink,
    F: Future<Output = ()>,
{
    if interval_seconds == 0 {
        tracing::info!("periodic queue drain disabled (interval=0)");
        return;
    }

    let mut ticker = interval(Duration::from_secs(interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; startup already drained.
    ticker.tick().await;

    tracing::info!(interval_seconds, "starting periodic queue drain");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                let report = tracer.drain_queue().await;
                if report.outcome == DrainOutcome::AlreadyRunning {
                    tracing::debug!("skipped periodic drain, previous one still running");
                }
            }
        }
    }
    tracing::info!("periodic queue drain stopped");
}
