//! Client Connection Management
//!
//! Each accepted TCP connection is served by its own async task running
//! the read loop in [`handler`]. Commands on one connection are strictly
//! serialized: the reply to command N is written before command N+1 is
//! framed. Partial lines are buffered across reads, and several commands
//! arriving in one TCP segment are all served in order.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                TCP Listener                 │
//! │                (server module)              │
//! └──────────────────────┬──────────────────────┘
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   one task per client  │
//!           └────────────┬───────────┘
//!                        ▼
//! ┌─────────────────────────────────────────────┐
//! │              ConnectionHandler              │
//! │   read ──> frame line ──> execute ──> reply │
//! └─────────────────────────────────────────────┘
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
