//! Shared test utilities for runway integration tests.
//!
//! This crate provides:
//! - [`TracingMemoryBackend`]: In-memory storage with operation recording and
//!   failure injection
//! - Fixture builders for sales and inventory query results
//!
//! # Example
//!
//! ```rust,ignore
//! use runway_test_utils::{TracingMemoryBackend, SalesFixture};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let storage = TracingMemoryBackend::new();
//!     let sales = SalesFixture::new(report_date()).daily("OR-L", "Original", &[10, 12]).table();
//!     // ... run test ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;
pub mod storage;

pub use fixtures::*;
pub use storage::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("runway=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
