//! TCP Server Lifecycle
//!
//! Owns the listening socket, accepts connections, and coordinates
//! graceful shutdown. Each accepted connection gets its own task; the
//! server only tracks them enough to drain them when stopping.
//!
//! Shutdown is cooperative: a watch channel flips to `true`, the accept
//! loop exits and closes the listener, every connection handler observes
//! the flag at its next suspension point, and the expiry sweeper stops at
//! its next wake. In-flight commands complete; nothing is aborted.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::{ExpirySweeper, Keyspace, SweeperConfig};

/// A cloneable handle that triggers graceful shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Signals the server and every connection to wind down.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// The server: listener, shared keyspace, and shutdown plumbing.
pub struct Server {
    listener: TcpListener,
    store: Arc<Keyspace>,
    stats: Arc<ConnectionStats>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Binds a listener on `addr` and prepares a server around it.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener))
    }

    /// Wraps an already-bound listener.
    pub fn new(listener: TcpListener) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            listener,
            store: Arc::new(Keyspace::new()),
            stats: Arc::new(ConnectionStats::new()),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns a handle that can stop the server from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// The shared keyspace behind this server.
    pub fn store(&self) -> Arc<Keyspace> {
        Arc::clone(&self.store)
    }

    /// Shared connection counters.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts and serves connections until the shutdown handle fires.
    ///
    /// Blocks (asynchronously) for the whole server lifetime: the accept
    /// loop, then the drain of every live connection and the sweeper.
    pub async fn run(self) -> io::Result<()> {
        let sweeper = ExpirySweeper::start(Arc::clone(&self.store), SweeperConfig::default());
        let mut connections: JoinSet<()> = JoinSet::new();
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!(addr = %self.listener.local_addr()?, "listening");

        while !*shutdown_rx.borrow() {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let handler = CommandHandler::new(Arc::clone(&self.store));
                            connections.spawn(handle_connection(
                                stream,
                                addr,
                                handler,
                                self.shutdown_rx.clone(),
                                Arc::clone(&self.stats),
                            ));
                        }
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }
                // Reap finished handlers so the set stays small.
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = shutdown_rx.changed() => {}
            }
        }

        info!("shutting down, draining connections");
        drop(self.listener);
        while connections.join_next().await.is_some() {}
        sweeper.stop();
        info!("server stopped");
        Ok(())
    }
}
