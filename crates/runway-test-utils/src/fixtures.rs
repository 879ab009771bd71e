//! Pre-built query results for common test scenarios.
//!
//! Tables are shaped like the warehouse returns them: header row already
//! removed, aggregate columns carrying generated names such as `_col2`.

use chrono::{Days, NaiveDate};
use runway_warehouse::ResultTable;

/// Column names of a raw sales result.
pub const SALES_RESULT_COLUMNS: [&str; 5] =
    ["partition_date", "order_date", "sku", "sku_name", "qty_sold"];

/// Column names of a raw inventory result.
pub const INVENTORY_RESULT_COLUMNS: [&str; 3] = ["partition_date", "sku", "_col2"];

/// The report date used across fixtures.
#[must_use]
pub fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
}

/// Daily quantities of the documented worked example, most recent first.
pub const WORKED_EXAMPLE_WEEK: [u64; 7] = [10, 12, 9, 11, 10, 13, 8];

/// Builder for sales query results.
#[derive(Debug, Clone)]
pub struct SalesFixture {
    report_date: NaiveDate,
    rows: Vec<[Option<String>; 5]>,
}

impl SalesFixture {
    /// Creates an empty result for `report_date`.
    #[must_use]
    pub fn new(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            rows: Vec::new(),
        }
    }

    /// Adds one row per day ending the day before the report date.
    ///
    /// `qty_most_recent_first[0]` is the report date minus one day. Rows are
    /// stored oldest first, as the sales query orders them.
    #[must_use]
    pub fn daily(mut self, sku: &str, sku_name: &str, qty_most_recent_first: &[u64]) -> Self {
        for (offset, qty) in qty_most_recent_first.iter().enumerate().rev() {
            let order_date = self.report_date - Days::new(offset as u64 + 1);
            self.rows.push([
                Some(self.report_date.to_string()),
                Some(order_date.to_string()),
                Some(sku.to_string()),
                Some(sku_name.to_string()),
                Some(qty.to_string()),
            ]);
        }
        self
    }

    /// Adds a raw row; `None` cells are SQL `NULL`.
    #[must_use]
    pub fn raw(
        mut self,
        order_date: Option<&str>,
        sku: Option<&str>,
        sku_name: Option<&str>,
        qty: Option<&str>,
    ) -> Self {
        self.rows.push([
            Some(self.report_date.to_string()),
            order_date.map(str::to_string),
            sku.map(str::to_string),
            sku_name.map(str::to_string),
            qty.map(str::to_string),
        ]);
        self
    }

    /// Builds the result table.
    #[must_use]
    pub fn table(&self) -> ResultTable {
        ResultTable::new(
            SALES_RESULT_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            self.rows.iter().map(|r| r.to_vec()).collect(),
        )
        .expect("fixture rows match columns")
    }
}

/// Builder for inventory query results.
#[derive(Debug, Clone)]
pub struct InventoryFixture {
    report_date: NaiveDate,
    rows: Vec<[Option<String>; 3]>,
}

impl InventoryFixture {
    /// Creates an empty snapshot for `report_date`.
    #[must_use]
    pub fn new(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            rows: Vec::new(),
        }
    }

    /// Adds fulfillable units for `sku`.
    #[must_use]
    pub fn sku(mut self, sku: &str, units: u64) -> Self {
        self.rows.push([
            Some(self.report_date.to_string()),
            Some(sku.to_string()),
            Some(units.to_string()),
        ]);
        self
    }

    /// Adds units for a row without a sku.
    #[must_use]
    pub fn unreported(mut self, units: u64) -> Self {
        self.rows.push([
            Some(self.report_date.to_string()),
            None,
            Some(units.to_string()),
        ]);
        self
    }

    /// Builds the result table.
    #[must_use]
    pub fn table(&self) -> ResultTable {
        ResultTable::new(
            INVENTORY_RESULT_COLUMNS
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
            self.rows.iter().map(|r| r.to_vec()).collect(),
        )
        .expect("fixture rows match columns")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_rows_are_oldest_first() {
        let table = SalesFixture::new(report_date())
            .daily("OR-L", "Original", &[5, 6, 7])
            .table();

        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0][1].as_deref(), Some("2024-02-27"));
        assert_eq!(table.rows()[0][4].as_deref(), Some("7"));
        assert_eq!(table.rows()[2][1].as_deref(), Some("2024-02-29"));
        assert_eq!(table.rows()[2][4].as_deref(), Some("5"));
    }

    #[test]
    fn inventory_rows_can_omit_sku() {
        let table = InventoryFixture::new(report_date())
            .sku("OR-L", 240)
            .unreported(3)
            .table();
        assert_eq!(table.rows()[1][1], None);
        assert_eq!(table.columns()[2], "_col2");
    }
}
