//! Query templates and rendering.
//!
//! Templates use `{{name}}` placeholders. Only `lookback_days` and
//! `report_date` are defined; anything else left in the rendered text is an
//! error, so a typo in a config file fails before a query is submitted.

use chrono::NaiveDate;
use runway_core::report_paths::format_date;

use crate::error::{ReportError, Result};

/// Daily quantity sold per sku over the lookback window.
pub const SALES_QUERY_TEMPLATE: &str = "SELECT partition_date
    , order_date
    , sku
    , sku_name
    , SUM(qty_sold) AS qty_sold
FROM shopify_qty_sold_by_sku_daily
WHERE partition_date >= DATE(current_date - interval '{{lookback_days}}' day)
GROUP BY partition_date
    , order_date
    , sku
    , sku_name
ORDER BY order_date ASC";

/// Fulfillable inventory per sku for one snapshot date.
pub const INVENTORY_QUERY_TEMPLATE: &str = "WITH inventory AS (
    SELECT partition_date
        , CAST(sku AS VARCHAR) AS sku
        , total_fulfillable_quantity
    FROM shipbob_inventory
    WHERE partition_date = '{{report_date}}'
)
SELECT partition_date
    , CASE WHEN sku IS NULL THEN 'Not Reported' ELSE sku END AS sku
    , SUM(total_fulfillable_quantity)
FROM inventory
GROUP BY partition_date
    , CASE WHEN sku IS NULL THEN 'Not Reported' ELSE sku END";

/// Values substituted into templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParams {
    /// Days of sales history.
    pub lookback_days: u32,
    /// Report (snapshot) date.
    pub report_date: NaiveDate,
}

/// Renders `template` with `params`.
///
/// # Errors
///
/// Returns [`ReportError::Config`] if a placeholder remains unresolved.
pub fn render(template: &str, params: &QueryParams) -> Result<String> {
    let rendered = template
        .replace("{{lookback_days}}", &params.lookback_days.to_string())
        .replace("{{report_date}}", &format_date(params.report_date));

    if let Some(start) = rendered.find("{{") {
        let rest = &rendered[start..];
        let end = rest.find("}}").map_or(rest.len(), |i| i + 2);
        return Err(ReportError::config(format!(
            "unknown query placeholder {}",
            &rest[..end]
        )));
    }
    Ok(rendered)
}
