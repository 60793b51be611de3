//! Delivery tunables.

use serde::Deserialize;

/// Sizing of the delivery worker pool and the drain policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeliverySettings {
    /// Number of worker tasks delivering live statements concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Statements that may wait for a free worker before `emit` falls back
    /// to the durable queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Deterministic rejections tolerated for one queued entry before it is
    /// moved to the dead-letter table.
    #[serde(default = "default_max_rejections")]
    pub max_rejections: u32,
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_rejections() -> u32 {
    5
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            max_rejections: default_max_rejections(),
        }
    }
}
