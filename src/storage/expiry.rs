//! Background Expiry Sweeper
//!
//! This module implements the active half of expiration: a background
//! task that wakes on a fixed period, takes the keyspace lock, and
//! removes every elapsed entry. The lazy half (removal on access) lives
//! in the keyspace itself.
//!
//! Lazy expiry alone would leave keys that are never touched again
//! resident forever; the sweeper reclaims those. Because the expiry
//! table stores absolute instants, a late wake-up never extends a key's
//! lifetime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::storage::Keyspace;

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Fixed period between sweeps
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// Dropping the handle stops the sweeper task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the sweeper as a background task.
    ///
    /// Returns a handle that stops the task on [`stop`](Self::stop) or on
    /// drop.
    pub fn start(store: Arc<Keyspace>, config: SweeperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(store, config, shutdown_rx));
        info!("background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Signals the sweeper task to exit at its next wake-up.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The sweep loop: wait one period or a shutdown signal, then collect.
async fn sweeper_loop(
    store: Arc<Keyspace>,
    config: SweeperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let removed = store.sweep_expired();
        if removed > 0 {
            debug!(removed, remaining = store.len(), "expired keys swept");
        }
    }
}

/// Starts the expiry sweeper with the default one-second period.
pub fn start_expiry_sweeper(store: Arc<Keyspace>) -> ExpirySweeper {
    ExpirySweeper::start(store, SweeperConfig::default())
}
