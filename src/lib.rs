//! # FlintKV - An In-Memory Data-Structure Server
//!
//! FlintKV is a small Redis-style, in-memory key-value server written in
//! Rust. Clients connect over TCP, send text command lines, and receive
//! replies in a simplified subset of RESP.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             FlintKV                              │
//! │                                                                  │
//! │  ┌────────────┐    ┌─────────────┐    ┌─────────────┐            │
//! │  │   Server   │───>│ Connection  │───>│  Command    │            │
//! │  │ (listener) │    │  Handler    │    │  Handler    │            │
//! │  └────────────┘    └─────────────┘    └──────┬──────┘            │
//! │                                              │                   │
//! │  ┌────────────┐                              ▼                   │
//! │  │   Line     │    ┌──────────────────────────────────────────┐  │
//! │  │  Parser    │    │                Keyspace                  │  │
//! │  └────────────┘    │   Mutex< data + expiry tables >          │  │
//! │                    └──────────────────────────────────────────┘  │
//! │                                              ▲                   │
//! │                    ┌─────────────────────────┴────────────────┐  │
//! │                    │              ExpirySweeper               │  │
//! │                    │         (background tokio task)          │  │
//! │                    └──────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use flintkv::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind("127.0.0.1:6379").await?;
//!     let handle = server.shutdown_handle();
//!
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         handle.shutdown();
//!     });
//!
//!     server.run().await
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - **Strings**: `SET`, `GET`, `INCR`, `DECR`
//! - **Lists**: `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LLEN`, `LRANGE`
//! - **Sets**: `SADD`, `SREM`, `SMEMBERS`, `SCARD`, `SISMEMBER`
//! - **Hashes**: `HSET`, `HGET`, `HDEL`, `HKEYS`, `HVALS`, `HGETALL`
//! - **Keys**: `DEL`, `EXISTS`, `EXPIRE`, `TTL`, `KEYS`
//! - **Server**: `PING`, `FLUSHALL`
//!
//! ## Design Highlights
//!
//! - One coarse lock guards the keyspace and the expiry table together,
//!   so every command is atomic with respect to every other.
//! - Keys expire both lazily (on access) and actively (a background
//!   sweeper wakes once a second), and no observer ever sees an expired
//!   key.
//! - A value keeps its kind for its whole lifetime; wrong-kind commands
//!   fail without mutating anything.
//! - Collections never linger empty: removing the last element removes
//!   the key.
//!
//! ## Module Overview
//!
//! - [`protocol`]: line framing, tokenization, and reply serialization
//! - [`storage`]: the keyspace, typed values, and the expiry sweeper
//! - [`commands`]: dispatch of parsed requests to keyspace operations
//! - [`connection`]: the per-client read loop
//! - [`server`]: listener, accept loop, graceful shutdown
//! - [`client`]: a small demo client and the scripted walkthrough

pub mod client;
pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Reply, Request};
pub use server::{Server, ShutdownHandle};
pub use storage::{start_expiry_sweeper, ExpirySweeper, Keyspace, StoreError};

/// The default port FlintKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host FlintKV binds to
pub const DEFAULT_HOST: &str = "localhost";

/// Version of FlintKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
