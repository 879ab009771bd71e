//! Logging initialization and span helpers.
//!
//! Every runway component logs through `tracing`; this module owns the single
//! place where a subscriber is installed.

use std::sync::Once;

use chrono::NaiveDate;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for schedulers and log shippers).
    Json,
    /// Pretty-printed logs (for interactive runs).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `runway_warehouse=debug`)
///
/// # Example
///
/// ```rust
/// use runway_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let result = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false))
                .try_init(),
        };

        // A test harness may already own the global subscriber.
        if result.is_err() {
            tracing::debug!("global tracing subscriber already installed");
        }
    });
}

/// Creates a span for report operations keyed by report date.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use runway_core::observability::report_span;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let span = report_span("publish", date);
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn report_span(operation: &str, report_date: NaiveDate) -> Span {
    tracing::info_span!(
        "report",
        op = operation,
        report_date = %report_date,
    )
}

/// Creates a span for a warehouse query.
#[must_use]
pub fn query_span(label: &str, database: &str) -> Span {
    tracing::info_span!("query", label = label, database = database)
}
