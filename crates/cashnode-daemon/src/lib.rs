//! cashnode-daemon: node wiring for the double-spend proof protocol.
//!
//! Holds the mempool, the connected peers and the respend state, and
//! dispatches peer messages to transaction admission and the `dsproof`
//! message handlers. The binary in `main.rs` loads the configuration,
//! installs logging and drives the periodic orphan cleanup.

pub mod cleanup;
pub mod config;
pub mod message;
pub mod node;
pub mod peers;
pub mod validation;

pub use config::DaemonConfig;
pub use message::NetMessage;
pub use node::{AdmissionError, Node};
pub use peers::PeerRegistry;
