//! Amazon Athena client over the JSON 1.1 protocol.
//!
//! Each operation is a signed `POST /` with an `X-Amz-Target` header naming the
//! action, e.g. `AmazonAthena.StartQueryExecution`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use runway_core::AwsCredentials;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::executor::{ExecutionStatus, QueryRequest, QueryState, ResultPage, WarehouseApi};
use crate::sigv4::{self, SigningRequest};

const SERVICE: &str = "athena";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AmazonAthena";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// Athena [`WarehouseApi`] implementation.
pub struct AthenaClient {
    http: Client,
    endpoint: Url,
    region: String,
    credentials: AwsCredentials,
}

impl std::fmt::Debug for AthenaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AthenaClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AthenaClient {
    /// Creates a client for the regional Athena endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(region: &str, credentials: AwsCredentials) -> Result<Self> {
        let endpoint = format!("https://athena.{region}.amazonaws.com/");
        Self::with_endpoint(&endpoint, region, credentials)
    }

    /// Creates a client for an explicit endpoint (VPC endpoints, local fakes).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a URL or the HTTP client cannot
    /// be constructed.
    pub fn with_endpoint(
        endpoint: &str,
        region: &str,
        credentials: AwsCredentials,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| QueryError::Validation(format!("invalid Athena endpoint {endpoint}: {e}")))?;
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| QueryError::transport("failed to create HTTP client", e))?;

        Ok(Self {
            http,
            endpoint,
            region: region.to_string(),
            credentials,
        })
    }

    async fn call<Req, Resp>(&self, action: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)
            .map_err(|e| QueryError::Validation(format!("failed to encode {action}: {e}")))?;
        let target = format!("{TARGET_PREFIX}.{action}");

        let signed = sigv4::sign(
            &SigningRequest {
                method: "POST",
                url: &self.endpoint,
                headers: &[("content-type", CONTENT_TYPE), ("x-amz-target", &target)],
                payload: &body,
            },
            &self.credentials,
            &self.region,
            SERVICE,
            Utc::now(),
        )?;

        let mut req = self
            .http
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", &target)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            req = req.header("x-amz-security-token", token);
        }

        let response = req
            .body(body)
            .send()
            .await
            .map_err(|e| QueryError::transport(format!("{action} request failed"), e))?;

        let status = response.status();
        let error_type = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response
            .text()
            .await
            .map_err(|e| QueryError::transport(format!("{action} response unreadable"), e))?;
        debug!(action, status = status.as_u16(), "athena response");

        if status.is_success() {
            serde_json::from_str(&text)
                .map_err(|e| QueryError::Decode(format!("{action} response: {e}")))
        } else {
            Err(parse_error_body(status.as_u16(), error_type.as_deref(), &text))
        }
    }
}

/// Maps an AWS JSON error response to a [`QueryError`].
///
/// The body's `__type` wins over the `x-amzn-ErrorType` header.
fn parse_error_body(status: u16, header_type: Option<&str>, body: &str) -> QueryError {
    let parsed = serde_json::from_str::<AwsErrorBody>(body).ok();
    let (body_type, message) = match parsed {
        Some(err) => (err.error_type, err.message.or(err.message_lower)),
        None => (None, None),
    };
    let message = message.unwrap_or_else(|| {
        if body.trim().is_empty() {
            "no message".to_string()
        } else {
            body.chars().take(512).collect()
        }
    });
    match body_type.as_deref().or(header_type) {
        Some(code) => QueryError::from_service_code(code, message),
        None => QueryError::Service {
            code: format!("Http{status}"),
            message,
        },
    }
}

#[async_trait]
impl WarehouseApi for AthenaClient {
    async fn start_query_execution(&self, request: &QueryRequest) -> Result<String> {
        let body = StartQueryExecutionInput {
            query_string: &request.query,
            query_execution_context: QueryExecutionContext {
                database: &request.database,
            },
            result_configuration: ResultConfiguration {
                output_location: &request.output_location,
            },
            work_group: request.work_group.as_deref(),
        };
        let out: StartQueryExecutionOutput = self.call("StartQueryExecution", &body).await?;
        out.query_execution_id
            .ok_or_else(|| QueryError::Decode("StartQueryExecution returned no id".into()))
    }

    async fn get_query_execution(&self, execution_id: &str) -> Result<ExecutionStatus> {
        let out: GetQueryExecutionOutput = self
            .call(
                "GetQueryExecution",
                &ExecutionIdInput {
                    query_execution_id: execution_id,
                },
            )
            .await?;

        let status = out
            .query_execution
            .and_then(|q| q.status)
            .ok_or_else(|| QueryError::Decode("GetQueryExecution returned no status".into()))?;
        let state = status
            .state
            .ok_or_else(|| QueryError::Decode("GetQueryExecution returned no state".into()))?;

        Ok(ExecutionStatus {
            state: QueryState::parse(&state),
            reason: status.state_change_reason,
        })
    }

    async fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
        max_results: u32,
    ) -> Result<ResultPage> {
        let out: GetQueryResultsOutput = self
            .call(
                "GetQueryResults",
                &GetQueryResultsInput {
                    query_execution_id: execution_id,
                    next_token,
                    max_results,
                },
            )
            .await?;
        Ok(out.into_page())
    }

    async fn stop_query_execution(&self, execution_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "StopQueryExecution",
                &ExecutionIdInput {
                    query_execution_id: execution_id,
                },
            )
            .await?;
        Ok(())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionInput<'a> {
    query_string: &'a str,
    query_execution_context: QueryExecutionContext<'a>,
    result_configuration: ResultConfiguration<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    work_group: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionContext<'a> {
    database: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResultConfiguration<'a> {
    output_location: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionIdInput<'a> {
    query_execution_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsInput<'a> {
    query_execution_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionOutput {
    query_execution_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionOutput {
    query_execution: Option<QueryExecution>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: Option<QueryExecutionStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionStatus {
    state: Option<String>,
    state_change_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsOutput {
    #[serde(default)]
    result_set: ResultSet,
    next_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSet {
    #[serde(default)]
    rows: Vec<Row>,
    #[serde(default)]
    result_set_metadata: ResultSetMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSetMetadata {
    #[serde(default)]
    column_info: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ColumnInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Row {
    #[serde(default)]
    data: Vec<Datum>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datum {
    var_char_value: Option<String>,
}

impl GetQueryResultsOutput {
    fn into_page(self) -> ResultPage {
        ResultPage {
            columns: self
                .result_set
                .result_set_metadata
                .column_info
                .into_iter()
                .map(|c| c.name)
                .collect(),
            rows: self
                .result_set
                .rows
                .into_iter()
                .map(|row| row.data.into_iter().map(|d| d.var_char_value).collect())
                .collect(),
            next_token: self.next_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AwsErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "message")]
    message_lower: Option<String>,
}
