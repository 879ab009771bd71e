//! Error types for the report pipeline.

use runway_warehouse::QueryError;

/// The result type used throughout runway-report.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while building or publishing a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A warehouse query failed.
    #[error("warehouse query failed: {0}")]
    Query(#[from] QueryError),

    /// Storage or other shared-primitive failure.
    #[error(transparent)]
    Core(#[from] runway_core::Error),

    /// The report configuration is invalid.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// A query result lacks an expected column.
    #[error("{query} result is missing column {column:?}")]
    MissingColumn {
        /// Query label.
        query: String,
        /// Expected column name.
        column: String,
    },

    /// A result row could not be interpreted.
    #[error("{query} row {row}: {message}")]
    InvalidRow {
        /// Query label.
        query: String,
        /// Zero-based data row index.
        row: usize,
        /// Description of the problem.
        message: String,
    },

    /// A tracked product has no sales in the lookback window.
    #[error("no sales history for product {product:?}")]
    NoSalesHistory {
        /// Product display name.
        product: String,
    },

    /// The run was cancelled before the report was published.
    #[error("run for {report_date} cancelled before publishing")]
    Cancelled {
        /// Report date of the abandoned run.
        report_date: chrono::NaiveDate,
    },

    /// The CSV artifact could not be written.
    #[error("failed to serialize report: {0}")]
    Csv(#[from] csv::Error),
}

impl ReportError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_row(query: &str, row: usize, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            query: query.to_string(),
            row,
            message: message.into(),
        }
    }
}
