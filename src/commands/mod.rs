//! Command Processing Layer
//!
//! Receives parsed requests, validates them, executes them against the
//! keyspace, and produces reply frames.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Keyspace     │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - Strings: `SET`, `GET`, `INCR`, `DECR`
//! - Lists: `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LLEN`, `LRANGE`
//! - Sets: `SADD`, `SREM`, `SMEMBERS`, `SCARD`, `SISMEMBER`
//! - Hashes: `HSET`, `HGET`, `HDEL`, `HKEYS`, `HVALS`, `HGETALL`
//! - Keys: `DEL`, `EXISTS`, `EXPIRE`, `TTL`, `KEYS`
//! - Server: `PING`, `FLUSHALL`

pub mod handler;

// Re-export the main command handler
pub use handler::CommandHandler;
