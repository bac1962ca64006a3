//! Background expiry sweeper.
//!
//! Periodically calls [`MemoryStore::sweep`] with the clock's current time so
//! expired entries are physically removed even if nobody reads them again.

use std::sync::Arc;
use std::time::Duration;

use rolectx_core::clock::Clock;
use rolectx_core::event::{DomainEvent, EventBus};
use rolectx_core::memory::MemoryStore;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct Sweeper {
    store: Arc<dyn MemoryStore>,
    clock: Arc<dyn Clock>,
    every: Duration,
    events: Option<Arc<EventBus>>,
}

impl Sweeper {
    pub fn new(store: Arc<dyn MemoryStore>, clock: Arc<dyn Clock>, every: Duration) -> Self {
        Self {
            store,
            clock,
            every,
            events: None,
        }
    }

    /// Publish a `MemorySwept` event for every pass that removes something.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run one pass now; returns how many entries were removed.
    pub async fn run_once(&self) -> usize {
        let now = self.clock.now();
        match self.store.sweep(now).await {
            Ok(0) => {
                debug!(backend = %self.store.name(), "Sweep found nothing expired");
                0
            }
            Ok(removed) => {
                info!(backend = %self.store.name(), removed = removed, "Swept expired memories");
                if let Some(events) = &self.events {
                    events.publish(DomainEvent::MemorySwept {
                        removed,
                        timestamp: now,
                    });
                }
                removed
            }
            Err(e) => {
                warn!(backend = %self.store.name(), error = %e, "Memory sweep failed");
                0
            }
        }
    }

    /// Start the background loop. The first pass runs immediately.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("Sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }
}

/// Handle to a running sweeper loop.
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            warn!(error = %e, "Sweeper task ended abnormally");
        }
    }
}
