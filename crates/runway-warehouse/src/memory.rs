//! Deterministic warehouse doubles.
//!
//! [`ScriptedApi`] replays a fixed sequence of execution states and result
//! pages, for exercising [`QueryRunner`](crate::QueryRunner).
//! [`InMemoryWarehouse`] answers whole queries from canned tables, for
//! exercising callers of [`QueryExecutor`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{QueryError, Result};
use crate::executor::{
    ExecutionStatus, QueryExecutor, QueryRequest, QueryState, ResultPage, WarehouseApi,
};
use crate::table::ResultTable;

#[derive(Debug, Default)]
struct ScriptState {
    states: VecDeque<String>,
    last_state: Option<String>,
    failure_reason: Option<String>,
    pages: VecDeque<ResultPage>,
    submit_error: Option<(String, String)>,
    submitted: Vec<QueryRequest>,
    status_calls: usize,
    stop_calls: usize,
    page_tokens: Vec<Option<String>>,
}

/// Scripted [`WarehouseApi`]: returns the configured states in order (the last
/// one repeats) and the configured pages in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedApi {
    inner: Arc<Mutex<ScriptState>>,
}

impl ScriptedApi {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends execution states, e.g. `["QUEUED", "RUNNING", "SUCCEEDED"]`.
    #[must_use]
    pub fn with_states(self, states: &[&str]) -> Self {
        self.state()
            .states
            .extend(states.iter().map(|s| (*s).to_string()));
        self
    }

    /// Sets the reason reported alongside a terminal failure state.
    #[must_use]
    pub fn with_failure_reason(self, reason: &str) -> Self {
        self.state().failure_reason = Some(reason.to_string());
        self
    }

    /// Appends a results page; empty cells are `NULL`.
    #[must_use]
    pub fn with_page(self, columns: &[&str], rows: &[&[&str]], next_token: Option<&str>) -> Self {
        let page = ResultPage {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (!cell.is_empty()).then(|| (*cell).to_string()))
                        .collect()
                })
                .collect(),
            next_token: next_token.map(str::to_string),
        };
        self.state().pages.push_back(page);
        self
    }

    /// Makes submission fail with the given service error code.
    #[must_use]
    pub fn with_submit_error(self, code: &str, message: &str) -> Self {
        self.state().submit_error = Some((code.to_string(), message.to_string()));
        self
    }

    /// Requests submitted so far.
    #[must_use]
    pub fn submitted(&self) -> Vec<QueryRequest> {
        self.state().submitted.clone()
    }

    /// Number of status checks made.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.state().status_calls
    }

    /// Number of stop requests made.
    #[must_use]
    pub fn stop_calls(&self) -> usize {
        self.state().stop_calls
    }

    /// Pagination tokens passed to each results call, in order.
    #[must_use]
    pub fn page_tokens(&self) -> Vec<Option<String>> {
        self.state().page_tokens.clone()
    }
}

#[async_trait]
impl WarehouseApi for ScriptedApi {
    async fn start_query_execution(&self, request: &QueryRequest) -> Result<String> {
        let mut state = self.state();
        if let Some((code, message)) = &state.submit_error {
            return Err(QueryError::from_service_code(code, message.clone()));
        }
        state.submitted.push(request.clone());
        Ok(format!("exec-{}", state.submitted.len()))
    }

    async fn get_query_execution(&self, _execution_id: &str) -> Result<ExecutionStatus> {
        let mut state = self.state();
        state.status_calls += 1;
        let raw = match state.states.pop_front() {
            Some(s) => {
                state.last_state = Some(s.clone());
                s
            }
            None => state
                .last_state
                .clone()
                .ok_or_else(|| QueryError::Decode("script has no execution states".into()))?,
        };
        let query_state = QueryState::parse(&raw);
        let reason = if query_state.is_pending() || query_state == QueryState::Succeeded {
            None
        } else {
            state.failure_reason.clone()
        };
        Ok(ExecutionStatus {
            state: query_state,
            reason,
        })
    }

    async fn get_query_results(
        &self,
        _execution_id: &str,
        next_token: Option<&str>,
        _max_results: u32,
    ) -> Result<ResultPage> {
        let mut state = self.state();
        state.page_tokens.push(next_token.map(str::to_string));
        Ok(state.pages.pop_front().unwrap_or_default())
    }

    async fn stop_query_execution(&self, _execution_id: &str) -> Result<()> {
        self.state().stop_calls += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum CannedResponse {
    Table(ResultTable),
    Error { code: String, message: String },
}

/// [`QueryExecutor`] answering from canned responses matched by a substring of
/// the query text. The first matching registration wins.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWarehouse {
    responses: Vec<(String, CannedResponse)>,
    executed: Arc<Mutex<Vec<QueryRequest>>>,
}

impl InMemoryWarehouse {
    /// Creates a warehouse with no registered responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers queries containing `needle` with `table`.
    #[must_use]
    pub fn with_table(mut self, needle: &str, table: ResultTable) -> Self {
        self.responses
            .push((needle.to_string(), CannedResponse::Table(table)));
        self
    }

    /// Fails queries containing `needle` with a service error.
    #[must_use]
    pub fn with_error(mut self, needle: &str, code: &str, message: &str) -> Self {
        self.responses.push((
            needle.to_string(),
            CannedResponse::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        ));
        self
    }

    /// Requests executed so far.
    #[must_use]
    pub fn executed(&self) -> Vec<QueryRequest> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl QueryExecutor for InMemoryWarehouse {
    async fn execute(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultTable> {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled {
                execution_id: String::new(),
            });
        }
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let response = self
            .responses
            .iter()
            .find(|(needle, _)| request.query.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| QueryError::ResourceNotFound {
                message: format!("no canned response for query {}", request.label),
            })?;

        match response {
            CannedResponse::Table(table) => Ok(table),
            CannedResponse::Error { code, message } => {
                Err(QueryError::from_service_code(&code, message))
            }
        }
    }
}
