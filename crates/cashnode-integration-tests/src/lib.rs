//! Integration test crate for the cashnode double-spend proof protocol.
//!
//! This crate has no library code. It only contains integration tests
//! that exercise proof and respend flows across multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p cashnode-integration-tests
//! ```
