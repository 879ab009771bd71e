//! # runway-report
//!
//! The inventory runway report: how many days each tracked product's on-hand
//! inventory lasts at its recent daily sales rate.
//!
//! A run for one report date:
//!
//! 1. queries the trailing sales history and the report date's inventory
//!    snapshot ([`queries`], [`sales`], [`inventory`]),
//! 2. forecasts a daily run rate per product from trailing-window quartiles
//!    ([`stats`], [`forecast`]),
//! 3. left-joins forecasts to inventory and derives days of stock
//!    ([`stockout`]),
//! 4. replaces the date's CSV artifact in object storage ([`report`],
//!    [`publisher`]).
//!
//! [`ReportPipeline`] wires the steps together.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

mod columns;
pub mod config;
pub mod error;
pub mod forecast;
pub mod inventory;
pub mod pipeline;
pub mod publisher;
pub mod queries;
pub mod report;
pub mod sales;
pub mod stats;
pub mod stockout;

pub use config::{PollSettings, ReportConfig, RuntimeEnv};
pub use error::{ReportError, Result};
pub use forecast::{FORECAST_LABEL, Forecaster, RunRateForecast, WindowStats};
pub use inventory::{InventoryLevels, InventorySnapshot, NOT_REPORTED_SKU};
pub use pipeline::{InventoryReport, ReportPipeline, RunSummary, default_report_date};
pub use publisher::{PublishOutcome, ReportPublisher, UploadStatus};
pub use report::{REPORT_HEADER, to_csv};
pub use sales::{SalesHistory, SalesRecord};
pub use stockout::{DaysOfStock, InventoryReportRow, join_inventory};
