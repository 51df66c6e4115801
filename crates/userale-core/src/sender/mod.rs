//! Buffer flushing and delivery.
//!
//! Two triggers drain the shared buffer. The interval trigger runs every
//! `transmit_interval` ms and flushes once `log_count_threshold` logs have
//! accumulated. The unload trigger flushes whatever is left when the page
//! goes away. Delivery is best effort: failed attempts are retried within
//! a fixed budget and then the batch is dropped.

pub mod http;
pub mod transport;

pub use http::HttpTransport;
pub use transport::{CONTENT_TYPE, Transport};

use crate::context::Context;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use userale_common::protocol::BufferedLog;

/// Retry budget for the synchronous unload fallback.
pub const UNLOAD_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered { attempts: u32 },
    Dropped { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadFlush {
    Empty,
    Beaconed { logs: usize },
    Sent(Delivery),
}

/// Sends `batch`, retrying up to `retries` more times after a failed
/// attempt. Never returns an error; exhausting the budget drops the batch.
pub async fn deliver(transport: &dyn Transport, batch: &[BufferedLog], retries: u32) -> Delivery {
    let mut remaining = retries;
    let mut attempts = 0;

    loop {
        attempts += 1;
        match transport.send(batch).await {
            Ok(()) => return Delivery::Delivered { attempts },
            Err(e) if remaining > 0 => {
                remaining -= 1;
                debug!(attempts, remaining, "Delivery failed, retrying: {}", e);
            }
            Err(e) => {
                warn!(
                    logs = batch.len(),
                    attempts, "Dropping batch after failed delivery: {}", e
                );
                return Delivery::Dropped { attempts };
            }
        }
    }
}

#[derive(Clone)]
pub struct Sender {
    ctx: Context,
    transport: Arc<dyn Transport>,
    in_flight: Arc<Mutex<JoinSet<Delivery>>>,
}

impl Sender {
    pub fn new(ctx: Context, transport: Arc<dyn Transport>) -> Self {
        Self {
            ctx,
            transport,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Drains the buffer if it has reached the configured threshold.
    pub fn take_due_batch(&self) -> Option<Vec<BufferedLog>> {
        let threshold = self.ctx.config.read(|c| c.log_count_threshold);
        self.ctx.buffer.drain_at_least(threshold)
    }

    /// One interval tick: flush if due, delivering on a background task so
    /// the tick never waits on the network. Returns whether a batch left.
    pub fn flush_on_interval(&self) -> bool {
        let Some(batch) = self.take_due_batch() else {
            return false;
        };
        let retries = self.ctx.config.read(|c| c.transmit_retries);
        info!(logs = batch.len(), "Flushing log buffer");

        let transport = self.transport.clone();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // Reap finished deliveries so the set only holds pending ones.
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move { deliver(transport.as_ref(), &batch, retries).await });
        true
    }

    /// Waits for every interval delivery started so far and returns their
    /// outcomes in completion order.
    pub async fn wait_for_deliveries(&self) -> Vec<Delivery> {
        let mut pending = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *in_flight)
        };
        let mut outcomes = Vec::new();
        while let Some(result) = pending.join_next().await {
            match result {
                Ok(delivery) => outcomes.push(delivery),
                Err(e) => warn!("Delivery task failed: {}", e),
            }
        }
        outcomes
    }

    /// Runs the interval trigger until the returned task is aborted. The
    /// interval is re-read from the configuration before every wait.
    pub fn spawn_interval(&self) -> JoinHandle<()> {
        let sender = self.clone();
        tokio::spawn(async move {
            loop {
                let period = sender.ctx.config.read(|c| c.transmit_interval);
                tokio::time::sleep(Duration::from_millis(period)).await;
                sender.flush_on_interval();
            }
        })
    }

    /// Flushes everything left in the buffer as the page goes away. The
    /// beacon, when available, carries the whole buffer even if it is
    /// empty; otherwise a non-empty buffer is sent with a budget of
    /// `UNLOAD_RETRIES`.
    pub async fn flush_on_unload(&self) -> UnloadFlush {
        let batch = self.ctx.buffer.drain();

        if self.transport.supports_beacon() && self.transport.beacon(&batch) {
            info!(logs = batch.len(), "Beaconed remaining logs");
            return UnloadFlush::Beaconed { logs: batch.len() };
        }
        if batch.is_empty() {
            return UnloadFlush::Empty;
        }

        info!(logs = batch.len(), "Sending remaining logs");
        UnloadFlush::Sent(deliver(self.transport.as_ref(), &batch, UNLOAD_RETRIES).await)
    }
}
