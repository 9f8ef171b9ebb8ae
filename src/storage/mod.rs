//! Keyspace and Expiration
//!
//! This module provides the shared in-memory keyspace: one map from keys
//! to typed values plus a parallel table of absolute expiration instants,
//! both behind a single coarse lock, and the background sweeper that
//! reclaims expired keys nobody touches.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Keyspace                     │
//! │  ┌────────────────────────────────────────┐  │
//! │  │ Mutex<Inner>                           │  │
//! │  │   data:   HashMap<String, Value>       │  │
//! │  │   expiry: HashMap<String, Instant>     │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//!                       ▲
//!                       │ sweep_expired()
//!         ┌─────────────┴─────────────┐
//!         │       ExpirySweeper       │
//!         │  (background tokio task)  │
//!         └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use flintkv::storage::Keyspace;
//!
//! let store = Keyspace::new();
//! store.set("name".to_string(), "flint".to_string());
//! assert_eq!(store.get("name").unwrap(), Some("flint".to_string()));
//!
//! store.lpush("jobs", &["a".to_string(), "b".to_string()]).unwrap();
//! assert_eq!(store.llen("jobs").unwrap(), 2);
//! ```

pub mod expiry;
pub mod keyspace;
pub mod value;

// Re-export commonly used types
pub use expiry::{start_expiry_sweeper, ExpirySweeper, SweeperConfig};
pub use keyspace::{glob_match, Keyspace, StoreError, StoreResult};
pub use value::Value;
