//! Sales history: typed records and per-product indexing.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use runway_warehouse::ResultTable;
use serde::Serialize;
use tracing::{info, warn};

use crate::columns::Columns;
use crate::error::{ReportError, Result};

/// Column names of the sales query, assigned positionally.
pub const SALES_COLUMNS: [&str; 5] = ["partition_date", "order_date", "sku", "sku_name", "qty_sold"];

const QUERY: &str = "sales";

/// Quantity sold of one sku on one order date, as seen in one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRecord {
    /// Warehouse partition the row came from.
    pub partition_date: NaiveDate,
    /// Date the orders were placed.
    pub order_date: NaiveDate,
    /// Stock keeping unit.
    pub sku: String,
    /// Product display name.
    pub sku_name: String,
    /// Units sold.
    pub qty_sold: u64,
    /// `%Y-%W` week of `order_date` (weeks start on Monday).
    pub week: String,
}

/// Rows discarded while reading the sales result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DroppedRows {
    /// Rows without a product name.
    pub missing_name: usize,
    /// Rows whose order date is `NULL` or unparseable.
    pub bad_order_date: usize,
    /// Rows without a sku.
    pub missing_sku: usize,
}

/// A distinct `(sku, sku_name)` pair seen in the lookback window.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CatalogEntry {
    /// Stock keeping unit.
    pub sku: String,
    /// Product display name.
    pub sku_name: String,
}

/// All sales records of the lookback window.
#[derive(Debug, Clone, Default)]
pub struct SalesHistory {
    records: Vec<SalesRecord>,
    dropped: DroppedRows,
}

impl SalesHistory {
    /// Builds the history from the sales query result.
    ///
    /// Columns are renamed positionally to [`SALES_COLUMNS`]. Rows without a
    /// product name, sku or parseable order date are dropped and counted.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Query`] if the column count is wrong and
    /// [`ReportError::InvalidRow`] for a bad partition date or quantity.
    pub fn from_table(table: ResultTable) -> Result<Self> {
        let table = table.with_column_names(&SALES_COLUMNS)?;
        let cols = Columns::resolve(QUERY, &table, &SALES_COLUMNS)?;

        let mut records = Vec::with_capacity(table.len());
        let mut dropped = DroppedRows::default();

        for (index, row) in table.rows().iter().enumerate() {
            let Some(sku_name) = cols.cell(row, 3) else {
                dropped.missing_name += 1;
                continue;
            };
            let Some(order_date) = cols.cell(row, 1).and_then(parse_date) else {
                warn!(row = index, raw = ?cols.cell(row, 1), "dropping sales row with unusable order_date");
                dropped.bad_order_date += 1;
                continue;
            };
            let Some(sku) = cols.cell(row, 2) else {
                warn!(row = index, sku_name, "dropping sales row without sku");
                dropped.missing_sku += 1;
                continue;
            };
            let partition_date = cols
                .cell(row, 0)
                .and_then(parse_date)
                .ok_or_else(|| {
                    ReportError::invalid_row(QUERY, index, "partition_date is missing or malformed")
                })?;
            let qty_sold = cols.quantity(row, 4, index, "qty_sold")?;

            records.push(SalesRecord {
                partition_date,
                order_date,
                sku: sku.to_string(),
                sku_name: sku_name.to_string(),
                qty_sold,
                week: week_key(order_date),
            });
        }

        let history = Self { records, dropped };
        history.log_summary();
        Ok(history)
    }

    fn log_summary(&self) {
        match self.date_range() {
            Some((min, max)) => info!(
                records = self.records.len(),
                min_order_date = %min,
                max_order_date = %max,
                dropped_missing_name = self.dropped.missing_name,
                dropped_bad_order_date = self.dropped.bad_order_date,
                dropped_missing_sku = self.dropped.missing_sku,
                "loaded sales history"
            ),
            None => warn!(
                dropped_missing_name = self.dropped.missing_name,
                dropped_bad_order_date = self.dropped.bad_order_date,
                "sales history is empty"
            ),
        }
    }

    /// All records in result order.
    #[must_use]
    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    /// Counts of rows dropped while reading.
    #[must_use]
    pub const fn dropped(&self) -> DroppedRows {
        self.dropped
    }

    /// Earliest and latest order dates.
    #[must_use]
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.order_date).min()?;
        let max = self.records.iter().map(|r| r.order_date).max()?;
        Some((min, max))
    }

    /// Records for `sku_name`, most recent order date first.
    ///
    /// Ties keep result order.
    #[must_use]
    pub fn for_product(&self, sku_name: &str) -> Vec<&SalesRecord> {
        let mut records: Vec<&SalesRecord> = self
            .records
            .iter()
            .filter(|r| r.sku_name == sku_name)
            .collect();
        records.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        records
    }

    /// Distinct `(sku, sku_name)` pairs sold in the window.
    #[must_use]
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.records
            .iter()
            .map(|r| CatalogEntry {
                sku: r.sku.clone(),
                sku_name: r.sku_name.clone(),
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Formats the `%Y-%W` week key of `date`.
#[must_use]
pub fn week_key(date: NaiveDate) -> String {
    date.format("%Y-%W").to_string()
}

/// Parses `YYYY-MM-DD`, optionally followed by a time of day.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn table(rows: &[&[&str]]) -> ResultTable {
        ResultTable::from_strs(
            &["partition_date", "order_date", "sku", "sku_name", "_col4"],
            rows,
        )
        .expect("table")
    }

    #[test]
    fn reads_rows_and_derives_week() {
        let history = SalesHistory::from_table(table(&[
            &["2024-03-01", "2024-02-26", "SC-L", "Salted Caramel", "4"],
            &["2024-03-01", "2024-02-27 00:00:00.000", "SC-L", "Salted Caramel", "6"],
        ]))
        .expect("history");

        assert_eq!(history.records().len(), 2);
        assert_eq!(history.records()[1].order_date, date("2024-02-27"));
        assert_eq!(history.records()[0].week, "2024-09");
        assert_eq!(
            history.date_range(),
            Some((date("2024-02-26"), date("2024-02-27")))
        );
    }

    #[test]
    fn drops_anomalies_and_counts_them() {
        let history = SalesHistory::from_table(table(&[
            &["2024-03-01", "2024-02-26", "SC-L", "", "4"],
            &["2024-03-01", "", "SC-L", "Salted Caramel", "4"],
            &["2024-03-01", "not-a-date", "SC-L", "Salted Caramel", "4"],
            &["2024-03-01", "2024-02-26", "", "Salted Caramel", "4"],
            &["2024-03-01", "2024-02-26", "SC-L", "Salted Caramel", "4"],
        ]))
        .expect("history");

        assert_eq!(history.records().len(), 1);
        assert_eq!(
            history.dropped(),
            DroppedRows {
                missing_name: 1,
                bad_order_date: 2,
                missing_sku: 1,
            }
        );
    }

    #[test]
    fn null_quantity_is_a_row_error() {
        let err = SalesHistory::from_table(table(&[&[
            "2024-03-01",
            "2024-02-26",
            "SC-L",
            "Salted Caramel",
            "",
        ]]))
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidRow { row: 0, .. }));
    }

    #[test]
    fn wrong_column_count_is_rejected() {
        let table = ResultTable::from_strs(&["a", "b"], &[]).expect("table");
        assert!(matches!(
            SalesHistory::from_table(table),
            Err(ReportError::Query(_))
        ));
    }

    #[test]
    fn product_history_is_most_recent_first_and_stable() {
        let history = SalesHistory::from_table(table(&[
            &["2024-03-01", "2024-02-25", "A", "Alpha", "1"],
            &["2024-03-01", "2024-02-27", "A", "Alpha", "2"],
            &["2024-03-01", "2024-02-26", "B", "Beta", "9"],
            &["2024-03-01", "2024-02-27", "A2", "Alpha", "3"],
        ]))
        .expect("history");

        let alpha = history.for_product("Alpha");
        let qty: Vec<u64> = alpha.iter().map(|r| r.qty_sold).collect();
        assert_eq!(qty, vec![2, 3, 1]);
        assert!(history.for_product("Gamma").is_empty());
    }

    #[test]
    fn catalog_is_distinct() {
        let history = SalesHistory::from_table(table(&[
            &["2024-03-01", "2024-02-25", "A", "Alpha", "1"],
            &["2024-03-02", "2024-02-25", "A", "Alpha", "1"],
            &["2024-03-01", "2024-02-26", "B", "Beta", "9"],
        ]))
        .expect("history");

        let catalog = history.catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].sku, "A");
    }

    #[test]
    fn week_key_uses_monday_weeks() {
        // 2024-01-01 is a Monday, so it opens week 01.
        assert_eq!(week_key(date("2024-01-01")), "2024-01");
        assert_eq!(week_key(date("2023-01-01")), "2023-00");
    }
}
