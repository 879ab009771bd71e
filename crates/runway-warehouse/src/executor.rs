//! Submit / poll / paginate query execution.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use runway_core::observability::query_span;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use crate::error::{QueryError, Result};
use crate::table::ResultTable;

/// Rows requested per results page (the Athena maximum).
pub const RESULTS_PAGE_SIZE: u32 = 1000;

/// A query to run against one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Short name used in logs, e.g. `sales`.
    pub label: String,
    /// Query text.
    pub query: String,
    /// Database the query runs in.
    pub database: String,
    /// Where the warehouse writes result files, e.g. `s3://bucket/prefix/`.
    pub output_location: String,
    /// Optional workgroup.
    pub work_group: Option<String>,
}

impl QueryRequest {
    /// Creates a validated request.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Validation`] if the query or database is blank, or
    /// the output location is not an `s3://` URI.
    pub fn new(
        label: impl Into<String>,
        query: impl Into<String>,
        database: impl Into<String>,
        output_location: impl Into<String>,
    ) -> Result<Self> {
        let request = Self {
            label: label.into(),
            query: query.into(),
            database: database.into(),
            output_location: output_location.into(),
            work_group: None,
        };
        if request.query.trim().is_empty() {
            return Err(QueryError::Validation(format!(
                "query text for {} is empty",
                request.label
            )));
        }
        if request.database.trim().is_empty() {
            return Err(QueryError::Validation(format!(
                "database for {} is empty",
                request.label
            )));
        }
        if !request.output_location.starts_with("s3://") {
            return Err(QueryError::Validation(format!(
                "output location must be an s3:// URI, got {:?}",
                request.output_location
            )));
        }
        Ok(request)
    }

    /// Sets the workgroup.
    #[must_use]
    pub fn with_work_group(mut self, work_group: impl Into<String>) -> Self {
        self.work_group = Some(work_group.into());
        self
    }
}

/// Execution state as reported by the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    /// Accepted, waiting for capacity.
    Queued,
    /// Executing.
    Running,
    /// Finished with results available.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Stopped before completion.
    Cancelled,
    /// A state this client does not know.
    Other(String),
}

impl QueryState {
    /// Parses the service's state string.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "QUEUED" => Self::Queued,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns true while the execution has not reached a terminal state.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Returns the service's spelling of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    /// Current state.
    pub state: QueryState,
    /// State change reason, typically set on failure.
    pub reason: Option<String>,
}

/// One page of raw results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    /// Column names from the result metadata.
    pub columns: Vec<String>,
    /// Rows exactly as returned, header row included on the first page.
    pub rows: Vec<Vec<Option<String>>>,
    /// Token for the next page, if any.
    pub next_token: Option<String>,
}

/// Low-level warehouse operations, one call per service request.
#[async_trait]
pub trait WarehouseApi: Send + Sync {
    /// Submits a query and returns its execution id.
    async fn start_query_execution(&self, request: &QueryRequest) -> Result<String>;

    /// Fetches the current execution status.
    async fn get_query_execution(&self, execution_id: &str) -> Result<ExecutionStatus>;

    /// Fetches one page of results.
    async fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
        max_results: u32,
    ) -> Result<ResultPage>;

    /// Asks the warehouse to stop an execution.
    async fn stop_query_execution(&self, execution_id: &str) -> Result<()>;
}

/// Runs a query to completion and returns its full result.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes `request`, waiting at most as long as the executor's poll
    /// policy allows, or until `cancel` fires.
    async fn execute(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultTable>;
}

/// Bounded exponential backoff between status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait after the first status check.
    pub initial_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: u32,
    /// Status checks before giving up with [`QueryError::Timeout`].
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2,
            max_attempts: 360,
        }
    }
}

impl PollPolicy {
    /// A policy that never sleeps, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1,
            max_attempts,
        }
    }

    /// Wait after the `attempt`-th status check (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// [`QueryExecutor`] on top of any [`WarehouseApi`].
#[derive(Debug, Clone)]
pub struct QueryRunner<A> {
    api: A,
    poll: PollPolicy,
}

impl<A: WarehouseApi> QueryRunner<A> {
    /// Creates a runner with the given poll policy.
    pub const fn new(api: A, poll: PollPolicy) -> Self {
        Self { api, poll }
    }

    /// Returns the underlying API.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Returns the poll policy.
    pub const fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    async fn wait_for_completion(
        &self,
        execution_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            let status = self.api.get_query_execution(execution_id).await?;
            info!(
                execution_id,
                state = %status.state,
                attempt = attempts,
                "query is in {} state",
                status.state
            );

            if status.state == QueryState::Succeeded {
                info!(execution_id, "query succeeded");
                return Ok(());
            }
            if !status.state.is_pending() {
                return Err(QueryError::Failed {
                    execution_id: execution_id.to_string(),
                    state: status.state.to_string(),
                    reason: status.reason.unwrap_or_else(|| "no reason given".into()),
                });
            }

            if attempts >= self.poll.max_attempts {
                self.stop_quietly(execution_id).await;
                return Err(QueryError::Timeout {
                    execution_id: execution_id.to_string(),
                    attempts,
                });
            }

            let delay = self.poll.delay_for(attempts);
            tokio::select! {
                () = cancel.cancelled() => {
                    self.stop_quietly(execution_id).await;
                    return Err(QueryError::Cancelled {
                        execution_id: execution_id.to_string(),
                    });
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn fetch_results(
        &self,
        execution_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ResultTable> {
        let first = self
            .api
            .get_query_results(execution_id, None, RESULTS_PAGE_SIZE)
            .await?;

        let mut rows = first.rows;
        // Row 0 of the first page repeats the column names.
        if !rows.is_empty() {
            rows.remove(0);
        }
        let mut table = ResultTable::new(first.columns, rows)?;

        let mut pages = 1_u32;
        let mut next_token = first.next_token;
        while let Some(token) = next_token {
            if cancel.is_cancelled() {
                return Err(QueryError::Cancelled {
                    execution_id: execution_id.to_string(),
                });
            }
            let page = self
                .api
                .get_query_results(execution_id, Some(&token), RESULTS_PAGE_SIZE)
                .await?;
            table.extend_rows(page.rows)?;
            next_token = page.next_token;
            pages += 1;
        }

        debug!(execution_id, pages, rows = table.len(), "fetched query results");
        Ok(table)
    }

    async fn stop_quietly(&self, execution_id: &str) {
        if let Err(e) = self.api.stop_query_execution(execution_id).await {
            warn!(execution_id, error = %e, "failed to stop query execution");
        }
    }

    async fn run(&self, request: &QueryRequest, cancel: &CancellationToken) -> Result<ResultTable> {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled {
                execution_id: String::new(),
            });
        }

        let execution_id = self.api.start_query_execution(request).await?;
        info!(execution_id = %execution_id, "submitted query");

        self.wait_for_completion(&execution_id, cancel).await?;
        self.fetch_results(&execution_id, cancel).await
    }
}

#[async_trait]
impl<A: WarehouseApi> QueryExecutor for QueryRunner<A> {
    async fn execute(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultTable> {
        let span = query_span(&request.label, &request.database);
        let result = self.run(request, cancel).instrument(span.clone()).await;

        let _guard = span.enter();
        match &result {
            Ok(table) => info!(rows = table.len(), "query returned results"),
            Err(e) => error!(kind = %e.kind(), error = %e, "query failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ScriptedApi;

    fn request() -> QueryRequest {
        QueryRequest::new("sales", "SELECT 1", "analytics", "s3://results/athena/")
            .expect("valid request")
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = PollPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            multiplier: 2,
            max_attempts: 10,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn request_validation() {
        assert!(QueryRequest::new("x", "  ", "db", "s3://r/").is_err());
        assert!(QueryRequest::new("x", "SELECT 1", "", "s3://r/").is_err());
        assert!(QueryRequest::new("x", "SELECT 1", "db", "/tmp/out").is_err());
    }

    #[test]
    fn parses_states() {
        assert!(QueryState::parse("QUEUED").is_pending());
        assert!(QueryState::parse("RUNNING").is_pending());
        assert!(!QueryState::parse("SUCCEEDED").is_pending());
        assert_eq!(QueryState::parse("WEIRD"), QueryState::Other("WEIRD".into()));
    }

    #[tokio::test]
    async fn polls_until_success_then_drops_header_once() {
        let api = ScriptedApi::new()
            .with_states(&["QUEUED", "RUNNING", "SUCCEEDED"])
            .with_page(&["sku", "qty"], &[&["sku", "qty"], &["A", "1"]], Some("t1"))
            .with_page(&["sku", "qty"], &[&["B", "2"], &["C", "3"]], None);
        let runner = QueryRunner::new(api, PollPolicy::immediate(10));

        let table = runner
            .execute(&request(), &CancellationToken::new())
            .await
            .expect("query should succeed");

        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0][0].as_deref(), Some("A"));
        assert_eq!(table.rows()[2][0].as_deref(), Some("C"));
        assert_eq!(runner.api().status_calls(), 3);
    }

    #[tokio::test]
    async fn failed_state_is_typed() {
        let api = ScriptedApi::new()
            .with_states(&["RUNNING", "FAILED"])
            .with_failure_reason("SYNTAX_ERROR: line 1:8");
        let runner = QueryRunner::new(api, PollPolicy::immediate(10));

        let err = runner
            .execute(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            QueryError::Failed { state, reason, .. } => {
                assert_eq!(state, "FAILED");
                assert!(reason.contains("SYNTAX_ERROR"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_and_stops_query() {
        let api = ScriptedApi::new().with_states(&["RUNNING"]);
        let runner = QueryRunner::new(api, PollPolicy::immediate(4));

        let err = runner
            .execute(&request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::Timeout { attempts: 4, .. }));
        assert_eq!(runner.api().status_calls(), 4);
        assert_eq!(runner.api().stop_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let api = ScriptedApi::new().with_states(&["RUNNING"]);
        let runner = QueryRunner::new(
            api,
            PollPolicy {
                initial_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(60),
                multiplier: 1,
                max_attempts: 100,
            },
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = runner.execute(&request(), &cancel).await.unwrap_err();
        assert!(matches!(err, QueryError::Cancelled { .. }));
        assert_eq!(runner.api().stop_calls(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_result_paging() {
        let api = ScriptedApi::new()
            .with_page(&["sku"], &[&["sku"], &["A"]], Some("t1"))
            .with_page(&["sku"], &[&["B"]], None);
        let runner = QueryRunner::new(api, PollPolicy::immediate(3));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner.fetch_results("q-1", &cancel).await.unwrap_err();
        assert!(matches!(err, QueryError::Cancelled { ref execution_id } if execution_id == "q-1"));
        assert_eq!(runner.api().page_tokens(), vec![None]);
    }

    #[tokio::test]
    async fn cancelled_before_submit_never_submits() {
        let api = ScriptedApi::new().with_states(&["SUCCEEDED"]);
        let runner = QueryRunner::new(api, PollPolicy::immediate(3));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner.execute(&request(), &cancel).await.unwrap_err();
        assert!(matches!(err, QueryError::Cancelled { .. }));
        assert_eq!(runner.api().submitted().len(), 0);
    }

    #[tokio::test]
    async fn submission_errors_propagate() {
        let api = ScriptedApi::new().with_submit_error("AccessDeniedException", "no athena:StartQueryExecution");
        let runner = QueryRunner::new(api, PollPolicy::immediate(3));

        let err = runner
            .execute(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::QueryErrorKind::AccessDenied);
    }
}
