//! Error types for warehouse query execution.

use std::fmt;

/// The result type used throughout runway-warehouse.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors that can occur while running a warehouse query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The request was rejected before submission (empty query, bad output location).
    #[error("parameter validation failed: {0}")]
    Validation(String),

    /// The service rejected the request, e.g. invalid SQL.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Service-provided message.
        message: String,
    },

    /// The database, table or execution does not exist.
    #[error("resource not found: {message}")]
    ResourceNotFound {
        /// Service-provided message.
        message: String,
    },

    /// The caller lacks permission.
    #[error("access denied: {message}")]
    AccessDenied {
        /// Service-provided message.
        message: String,
    },

    /// Any other service-side error.
    #[error("warehouse error {code}: {message}")]
    Service {
        /// Service error code, e.g. `ThrottlingException`.
        code: String,
        /// Service-provided message.
        message: String,
    },

    /// The query reached a terminal state other than `SUCCEEDED`.
    #[error("query {execution_id} finished in state {state}: {reason}")]
    Failed {
        /// Execution identifier.
        execution_id: String,
        /// Terminal state reported by the service.
        state: String,
        /// State change reason, if the service gave one.
        reason: String,
    },

    /// The query did not finish within the poll budget.
    #[error("query {execution_id} still running after {attempts} status checks")]
    Timeout {
        /// Execution identifier.
        execution_id: String,
        /// Number of status checks performed.
        attempts: u32,
    },

    /// The caller cancelled the wait.
    #[error("query {execution_id} was cancelled")]
    Cancelled {
        /// Execution identifier.
        execution_id: String,
    },

    /// The HTTP exchange itself failed.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service answered with a payload we could not interpret.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Stable classification of a [`QueryError`], used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// See [`QueryError::Validation`].
    Validation,
    /// See [`QueryError::InvalidRequest`].
    InvalidRequest,
    /// See [`QueryError::ResourceNotFound`].
    ResourceNotFound,
    /// See [`QueryError::AccessDenied`].
    AccessDenied,
    /// See [`QueryError::Service`].
    Service,
    /// See [`QueryError::Failed`].
    Failed,
    /// See [`QueryError::Timeout`].
    Timeout,
    /// See [`QueryError::Cancelled`].
    Cancelled,
    /// See [`QueryError::Transport`].
    Transport,
    /// See [`QueryError::Decode`].
    Decode,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::InvalidRequest => "invalid_request",
            Self::ResourceNotFound => "resource_not_found",
            Self::AccessDenied => "access_denied",
            Self::Service => "service",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Transport => "transport",
            Self::Decode => "decode",
        };
        f.write_str(s)
    }
}

impl QueryError {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> QueryErrorKind {
        match self {
            Self::Validation(_) => QueryErrorKind::Validation,
            Self::InvalidRequest { .. } => QueryErrorKind::InvalidRequest,
            Self::ResourceNotFound { .. } => QueryErrorKind::ResourceNotFound,
            Self::AccessDenied { .. } => QueryErrorKind::AccessDenied,
            Self::Service { .. } => QueryErrorKind::Service,
            Self::Failed { .. } => QueryErrorKind::Failed,
            Self::Timeout { .. } => QueryErrorKind::Timeout,
            Self::Cancelled { .. } => QueryErrorKind::Cancelled,
            Self::Transport { .. } => QueryErrorKind::Transport,
            Self::Decode(_) => QueryErrorKind::Decode,
        }
    }

    /// Classifies a service error code (the `__type` of an AWS JSON error).
    ///
    /// Codes may carry a namespace prefix, e.g.
    /// `com.amazonaws.athena#InvalidRequestException`, and a `:<uri>` suffix.
    #[must_use]
    pub fn from_service_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let short = code.split(':').next().unwrap_or(code);
        let short = short.rsplit('#').next().unwrap_or(short).trim();
        match short {
            "InvalidRequestException" => Self::InvalidRequest { message },
            "ResourceNotFoundException" | "MetadataException" => {
                Self::ResourceNotFound { message }
            }
            "AccessDeniedException" | "UnrecognizedClientException" => {
                Self::AccessDenied { message }
            }
            "ValidationException" | "SerializationException" => Self::Validation(message),
            other => Self::Service {
                code: other.to_string(),
                message,
            },
        }
    }

    /// Creates a transport error with a source cause.
    #[must_use]
    pub fn transport(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
