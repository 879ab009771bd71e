//! # runway-warehouse
//!
//! Query execution against the cloud data warehouse.
//!
//! A query goes through three steps: submit once, poll the execution until it
//! leaves `QUEUED`/`RUNNING`, then page through the results. The steps are the
//! [`WarehouseApi`] seam; [`QueryRunner`] owns the polling and pagination
//! policy on top of it and is what callers use through [`QueryExecutor`].
//!
//! - [`AthenaClient`]: Amazon Athena over the JSON 1.1 protocol, SigV4 signed
//! - [`ScriptedApi`] / [`InMemoryWarehouse`]: deterministic doubles for tests
//!
//! Every failure is a typed [`QueryError`]; nothing is swallowed.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod athena;
pub mod error;
pub mod executor;
pub mod memory;
pub mod sigv4;
pub mod table;

pub use athena::AthenaClient;
pub use error::{QueryError, QueryErrorKind, Result};
pub use executor::{
    ExecutionStatus, PollPolicy, QueryExecutor, QueryRequest, QueryRunner, QueryState,
    RESULTS_PAGE_SIZE, ResultPage, WarehouseApi,
};
pub use memory::{InMemoryWarehouse, ScriptedApi};
pub use table::ResultTable;
