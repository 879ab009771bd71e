//! Days of stock on hand.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::forecast::RunRateForecast;
use crate::inventory::InventoryLevels;

/// Whole days the on-hand inventory lasts at the upper run rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaysOfStock {
    /// `round_half_even(inventory_on_hand / upper_bound)`.
    Days(i64),
    /// The upper run rate is zero; runway is unbounded.
    ZeroRunRate,
    /// No inventory row matched the forecast.
    NoInventory,
}

impl DaysOfStock {
    /// Computes days of stock from on-hand units and a daily run rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn compute(inventory_on_hand: Option<u64>, upper_bound: f64) -> Self {
        let Some(units) = inventory_on_hand else {
            return Self::NoInventory;
        };
        if upper_bound <= 0.0 || !upper_bound.is_finite() {
            return Self::ZeroRunRate;
        }
        Self::Days((units as f64 / upper_bound).round_ties_even() as i64)
    }

    /// The day count, when there is one.
    #[must_use]
    pub const fn days(self) -> Option<i64> {
        match self {
            Self::Days(days) => Some(days),
            Self::ZeroRunRate | Self::NoInventory => None,
        }
    }
}

/// Renders the day count, or nothing for either sentinel.
impl fmt::Display for DaysOfStock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(days) => write!(f, "{days}"),
            Self::ZeroRunRate | Self::NoInventory => Ok(()),
        }
    }
}

impl Serialize for DaysOfStock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.days() {
            Some(days) => serializer.serialize_i64(days),
            None => serializer.serialize_none(),
        }
    }
}

/// One line of the published report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryReportRow {
    /// Report date.
    pub partition_date: NaiveDate,
    /// Stock keeping unit.
    pub sku: String,
    /// Product display name.
    pub sku_name: String,
    /// Forecast label.
    pub forecast: String,
    /// Conservative daily units.
    pub lower_bound: f64,
    /// Aggressive daily units.
    pub upper_bound: f64,
    /// Units on hand, when inventory was reported for the sku.
    pub inventory_on_hand: Option<u64>,
    /// Runway in days.
    pub days_of_stock_onhand: DaysOfStock,
}

/// Left-joins forecasts to inventory on `(partition_date, sku)`.
///
/// Produces exactly one row per forecast, in forecast order.
#[must_use]
pub fn join_inventory(
    forecasts: &[RunRateForecast],
    inventory: &InventoryLevels,
) -> Vec<InventoryReportRow> {
    forecasts
        .iter()
        .map(|f| {
            let on_hand = inventory.on_hand(f.partition_date, &f.sku);
            InventoryReportRow {
                partition_date: f.partition_date,
                sku: f.sku.clone(),
                sku_name: f.sku_name.clone(),
                forecast: f.forecast.clone(),
                lower_bound: f.lower_bound,
                upper_bound: f.upper_bound,
                inventory_on_hand: on_hand,
                days_of_stock_onhand: DaysOfStock::compute(on_hand, f.upper_bound),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::FORECAST_LABEL;

    fn report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("date")
    }

    fn forecast(sku: &str, upper_bound: f64) -> RunRateForecast {
        RunRateForecast {
            partition_date: report_date(),
            sku: sku.to_string(),
            sku_name: format!("{sku} name"),
            forecast: FORECAST_LABEL.to_string(),
            lower_bound: upper_bound / 2.0,
            upper_bound,
            windows: Vec::new(),
        }
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(DaysOfStock::compute(Some(240), 12.0), DaysOfStock::Days(20));
        assert_eq!(DaysOfStock::compute(Some(25), 10.0), DaysOfStock::Days(2));
        assert_eq!(DaysOfStock::compute(Some(35), 10.0), DaysOfStock::Days(4));
        assert_eq!(DaysOfStock::compute(Some(26), 10.0), DaysOfStock::Days(3));
        assert_eq!(DaysOfStock::compute(Some(0), 3.0), DaysOfStock::Days(0));
    }

    #[test]
    fn sentinels() {
        assert_eq!(DaysOfStock::compute(Some(10), 0.0), DaysOfStock::ZeroRunRate);
        assert_eq!(DaysOfStock::compute(Some(0), 0.0), DaysOfStock::ZeroRunRate);
        assert_eq!(DaysOfStock::compute(None, 4.0), DaysOfStock::NoInventory);
        assert_eq!(DaysOfStock::ZeroRunRate.to_string(), "");
        assert_eq!(DaysOfStock::Days(12).to_string(), "12");
        assert_eq!(
            serde_json::to_string(&DaysOfStock::NoInventory).expect("json"),
            "null"
        );
    }

    #[test]
    fn left_join_keeps_every_forecast_in_order() {
        let mut inventory = InventoryLevels::new(report_date());
        inventory.add("B", 240);
        inventory.add("Z", 1);

        let rows = join_inventory(&[forecast("A", 4.0), forecast("B", 12.0)], &inventory);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sku, "A");
        assert_eq!(rows[0].inventory_on_hand, None);
        assert_eq!(rows[0].days_of_stock_onhand, DaysOfStock::NoInventory);
        assert_eq!(rows[1].inventory_on_hand, Some(240));
        assert_eq!(rows[1].days_of_stock_onhand, DaysOfStock::Days(20));
    }

    #[test]
    fn join_requires_matching_date() {
        let other = NaiveDate::from_ymd_opt(2024, 2, 29).expect("date");
        let mut inventory = InventoryLevels::new(other);
        inventory.add("A", 100);

        let rows = join_inventory(&[forecast("A", 4.0)], &inventory);
        assert_eq!(rows[0].days_of_stock_onhand, DaysOfStock::NoInventory);
    }
}
