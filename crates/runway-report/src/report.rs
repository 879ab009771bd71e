//! CSV serialization of the report artifact.

use bytes::Bytes;

use crate::error::{ReportError, Result};
use crate::stockout::InventoryReportRow;

/// Header row of the published CSV, in column order.
pub const REPORT_HEADER: [&str; 8] = [
    "partition_date",
    "sku",
    "sku_name",
    "forecast",
    "lower_bound",
    "upper_bound",
    "inventory_on_hand",
    "days_of_stock_onhand",
];

/// Serializes `rows` as UTF-8 CSV with a header and no index column.
///
/// Bounds always carry a decimal point (`10.0`); absent inventory and
/// sentinel day counts are empty fields.
///
/// # Errors
///
/// Returns [`ReportError::Csv`] if writing fails.
pub fn to_csv(rows: &[InventoryReportRow]) -> Result<Bytes> {
    let mut writer = csv::Writer::from_writer(Vec::with_capacity(128 * (rows.len() + 1)));
    writer.write_record(REPORT_HEADER)?;

    for row in rows {
        writer.write_record([
            row.partition_date.format("%Y-%m-%d").to_string(),
            row.sku.clone(),
            row.sku_name.clone(),
            row.forecast.clone(),
            format_float(row.lower_bound),
            format_float(row.upper_bound),
            row.inventory_on_hand.map(|v| v.to_string()).unwrap_or_default(),
            row.days_of_stock_onhand.to_string(),
        ])?;
    }

    let buffer = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;
    Ok(Bytes::from(buffer))
}

/// Shortest round-trip representation, keeping `.0` on integral values.
fn format_float(value: f64) -> String {
    format!("{value:?}")
}
