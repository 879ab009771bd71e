//! On-hand inventory for the report date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use runway_warehouse::ResultTable;
use serde::Serialize;
use tracing::{info, warn};

use crate::columns::Columns;
use crate::error::{ReportError, Result};

/// Column names of the inventory query, assigned positionally.
pub const INVENTORY_COLUMNS: [&str; 3] = ["partition_date", "sku", "inventory_on_hand"];

/// Sku used for inventory rows that carry none.
pub const NOT_REPORTED_SKU: &str = "Not Reported";

const QUERY: &str = "inventory";

/// Fulfillable units of one sku on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySnapshot {
    /// Snapshot date.
    pub partition_date: NaiveDate,
    /// Stock keeping unit.
    pub sku: String,
    /// Fulfillable units.
    pub inventory_on_hand: u64,
}

/// Inventory per sku for exactly one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLevels {
    date: NaiveDate,
    by_sku: BTreeMap<String, u64>,
}

impl InventoryLevels {
    /// Creates empty levels for `date`.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            by_sku: BTreeMap::new(),
        }
    }

    /// Reads the inventory query result, keeping rows for `report_date` only.
    ///
    /// A missing or blank sku becomes [`NOT_REPORTED_SKU`]; repeated skus are
    /// summed.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Query`] if the column count is wrong and
    /// [`ReportError::InvalidRow`] for a malformed date or a `NULL`, negative
    /// or fractional quantity.
    pub fn from_table(table: ResultTable, report_date: NaiveDate) -> Result<Self> {
        let table = table.with_column_names(&INVENTORY_COLUMNS)?;
        let cols = Columns::resolve(QUERY, &table, &INVENTORY_COLUMNS)?;

        let mut levels = Self::new(report_date);
        let mut other_dates = 0_usize;

        for (index, row) in table.rows().iter().enumerate() {
            let date = cols
                .cell(row, 0)
                .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
                .ok_or_else(|| {
                    ReportError::invalid_row(QUERY, index, "partition_date is missing or malformed")
                })?;
            if date != report_date {
                other_dates += 1;
                continue;
            }
            let sku = cols.cell(row, 1).unwrap_or(NOT_REPORTED_SKU);
            let quantity = cols.quantity(row, 2, index, "inventory_on_hand")?;
            levels.add(sku, quantity);
        }

        if other_dates > 0 {
            warn!(
                rows = other_dates,
                report_date = %report_date,
                "ignored inventory rows from other partitions"
            );
        }
        info!(
            skus = levels.len(),
            total_units = levels.total_units(),
            report_date = %report_date,
            "loaded inventory snapshot"
        );
        Ok(levels)
    }

    /// Adds `quantity` units to `sku`.
    pub fn add(&mut self, sku: &str, quantity: u64) {
        let entry = self.by_sku.entry(sku.to_string()).or_default();
        *entry = entry.saturating_add(quantity);
    }

    /// Units on hand for `sku` on `date`; `None` when the date differs or the
    /// sku was not reported.
    #[must_use]
    pub fn on_hand(&self, date: NaiveDate, sku: &str) -> Option<u64> {
        if date == self.date {
            self.by_sku.get(sku).copied()
        } else {
            None
        }
    }

    /// Number of distinct skus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_sku.len()
    }

    /// Returns true when no sku was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_sku.is_empty()
    }

    /// Sum of all units.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.by_sku.values().fold(0, |acc, v| acc.saturating_add(*v))
    }

    /// One snapshot per sku, in sku order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<InventorySnapshot> {
        self.by_sku
            .iter()
            .map(|(sku, &inventory_on_hand)| InventorySnapshot {
                partition_date: self.date,
                sku: sku.clone(),
                inventory_on_hand,
            })
            .collect()
    }
}
