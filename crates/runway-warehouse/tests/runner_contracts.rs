//! Contract tests for query execution through the public API.

use runway_warehouse::{
    PollPolicy, QueryError, QueryErrorKind, QueryExecutor, QueryRequest, QueryRunner, ScriptedApi,
};
use tokio_util::sync::CancellationToken;

fn inventory_request() -> QueryRequest {
    QueryRequest::new(
        "inventory",
        "SELECT partition_date, sku, SUM(total_fulfillable_quantity) FROM shipbob_inventory",
        "prymal",
        "s3://prymal-ops/athena_query_results/",
    )
    .expect("valid request")
    .with_work_group("primary")
}

#[tokio::test]
async fn header_row_only_dropped_from_first_page() {
    // A data row that happens to look like a header on a later page must survive.
    let api = ScriptedApi::new()
        .with_states(&["SUCCEEDED"])
        .with_page(
            &["partition_date", "sku", "_col2"],
            &[&["partition_date", "sku", "_col2"], &["2024-03-01", "A", "5"]],
            Some("p2"),
        )
        .with_page(
            &["partition_date", "sku", "_col2"],
            &[&["partition_date", "sku", "_col2"]],
            Some("p3"),
        )
        .with_page(
            &["partition_date", "sku", "_col2"],
            &[&["2024-03-01", "", "7"]],
            None,
        );
    let runner = QueryRunner::new(api, PollPolicy::immediate(5));

    let table = runner
        .execute(&inventory_request(), &CancellationToken::new())
        .await
        .expect("results");

    assert_eq!(table.len(), 3);
    assert_eq!(table.rows()[1][0].as_deref(), Some("partition_date"));
    assert_eq!(table.rows()[2][1], None);
    assert_eq!(
        runner.api().page_tokens(),
        vec![None, Some("p2".to_string()), Some("p3".to_string())]
    );
}

#[tokio::test]
async fn submitted_request_is_forwarded_verbatim() {
    let api = ScriptedApi::new()
        .with_states(&["SUCCEEDED"])
        .with_page(&["x"], &[&["x"]], None);
    let runner = QueryRunner::new(api, PollPolicy::immediate(2));

    let table = runner
        .execute(&inventory_request(), &CancellationToken::new())
        .await
        .expect("results");
    assert!(table.is_empty());

    let submitted = runner.api().submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].database, "prymal");
    assert_eq!(submitted[0].work_group.as_deref(), Some("primary"));
}

#[tokio::test]
async fn cancelled_state_from_service_is_a_failure() {
    let api = ScriptedApi::new()
        .with_states(&["QUEUED", "CANCELLED"])
        .with_failure_reason("Query was cancelled by user");
    let runner = QueryRunner::new(api, PollPolicy::immediate(5));

    let err = runner
        .execute(&inventory_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), QueryErrorKind::Failed);
    assert!(matches!(err, QueryError::Failed { ref state, .. } if state == "CANCELLED"));
    assert_eq!(runner.api().stop_calls(), 0);
}
