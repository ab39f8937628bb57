//! Integration tests for workpool
//!
//! These tests drive real pools with real worker threads.
//! Run with: cargo test --test integration
//!
//! Set RUST_LOG=workpool=debug to see pool events in test output.

mod helpers;

mod dispatch;
mod handles;
mod lifecycle;
