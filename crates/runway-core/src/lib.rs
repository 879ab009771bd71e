//! # runway-core
//!
//! Shared primitives for the inventory runway report.
//!
//! This crate provides the foundational types used by the warehouse, report and
//! CLI crates:
//!
//! - **Error Types**: Shared error definitions and result types
//! - **Credentials**: Static AWS credentials with redacted `Debug`
//! - **Storage**: Object storage contract with in-memory and S3 backends
//! - **Report Paths**: Deterministic date-partitioned object keys
//! - **Observability**: Logging initialization and span helpers
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use runway_core::prelude::*;
//!
//! let paths = ReportPaths::shopify_default();
//! let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! assert!(paths.report_object(date).ends_with("shopify_inventory_report_2024-03-01.csv"));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod credentials;
pub mod error;
pub mod observability;
pub mod report_paths;
pub mod storage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::credentials::AwsCredentials;
    pub use crate::error::{Error, Result};
    pub use crate::report_paths::ReportPaths;
    pub use crate::storage::{
        ListPage, MemoryBackend, ObjectMeta, ObjectStoreBackend, PutResult, StorageBackend,
    };
}

pub use credentials::AwsCredentials;
pub use error::{Error, Result};
pub use observability::{LogFormat, init_logging, report_span};
pub use report_paths::{ReportPaths, parse_bucket};
pub use storage::{
    ListPage, MAX_KEYS_PER_REQUEST, MemoryBackend, ObjectMeta, ObjectStoreBackend, PutResult,
    StorageBackend,
};
