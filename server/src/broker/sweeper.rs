//! Deadline sweeper
//!
//! A single periodic task that returns expired `delivered` entries to
//! `waiting` across all subscriptions. The scan period should stay at or
//! below half the minimum ack deadline to bound redelivery latency.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::Broker;

pub struct DeadlineSweeper;

impl DeadlineSweeper {
    /// Spawn the sweep loop; stops when the shutdown signal flips
    pub fn start(
        broker: Arc<Broker>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => match broker.requeue_expired().await {
                        Ok(0) => {}
                        Ok(n) => {
                            tracing::debug!(requeued = n, "Expired deliveries returned to waiting")
                        }
                        Err(e) => tracing::warn!(error = %e, "Deadline sweep failed"),
                    },
                }
            }
            tracing::debug!("Deadline sweeper stopped");
        })
    }
}
