//! Daily run-rate forecast from trailing sales windows.
//!
//! For each window size `N` the most recent `N` records of a product are
//! summarized by their quartiles. The lower bound of the daily run rate is the
//! median of the window medians; the upper bound is the median of the window
//! 75th percentiles.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::sales::SalesRecord;
use crate::stats::{median, percentile};

/// Label carried in the `forecast` column.
pub const FORECAST_LABEL: &str = "forecast_daily";

/// Quartiles of one trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStats {
    /// Requested window size in records.
    pub window: usize,
    /// Records actually available (at most `window`).
    pub sample_size: usize,
    /// 25th percentile of units sold.
    pub p25: f64,
    /// Median units sold.
    pub median: f64,
    /// 75th percentile of units sold.
    pub p75: f64,
}

/// Daily run-rate forecast for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRateForecast {
    /// Report date the forecast is valid for.
    pub partition_date: NaiveDate,
    /// Sku of the most recent sales record.
    pub sku: String,
    /// Product display name.
    pub sku_name: String,
    /// Always [`FORECAST_LABEL`].
    pub forecast: String,
    /// Conservative daily units.
    pub lower_bound: f64,
    /// Aggressive daily units.
    pub upper_bound: f64,
    /// Per-window statistics the bounds were blended from.
    pub windows: Vec<WindowStats>,
}

/// Computes [`RunRateForecast`]s over a fixed list of windows.
#[derive(Debug, Clone)]
pub struct Forecaster {
    windows: Vec<usize>,
}

impl Forecaster {
    /// Creates a forecaster.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if `windows` is empty or contains zero.
    pub fn new(windows: Vec<usize>) -> Result<Self> {
        if windows.is_empty() || windows.contains(&0) {
            return Err(ReportError::config(format!(
                "forecast windows must be a non-empty list of positive sizes, got {windows:?}"
            )));
        }
        Ok(Self { windows })
    }

    /// Window sizes in evaluation order.
    #[must_use]
    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    /// Forecasts `sku_name` from `history`, which must be ordered most recent
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NoSalesHistory`] when `history` is empty.
    pub fn forecast(
        &self,
        sku_name: &str,
        history: &[&SalesRecord],
        report_date: NaiveDate,
    ) -> Result<RunRateForecast> {
        let most_recent = history.first().ok_or_else(|| ReportError::NoSalesHistory {
            product: sku_name.to_string(),
        })?;

        let windows = self
            .windows
            .iter()
            .map(|&window| window_stats(window, history))
            .collect::<Vec<_>>();

        let medians: Vec<f64> = windows.iter().map(|w| w.median).collect();
        let p75s: Vec<f64> = windows.iter().map(|w| w.p75).collect();
        // Both vectors have one entry per configured window, so neither is empty.
        let lower_bound = median(&medians).unwrap_or_default();
        let upper_bound = median(&p75s).unwrap_or_default();

        debug!(
            sku_name,
            sku = %most_recent.sku,
            records = history.len(),
            lower_bound,
            upper_bound,
            "computed run rate"
        );

        Ok(RunRateForecast {
            partition_date: report_date,
            sku: most_recent.sku.clone(),
            sku_name: sku_name.to_string(),
            forecast: FORECAST_LABEL.to_string(),
            lower_bound,
            upper_bound,
            windows,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn window_stats(window: usize, history: &[&SalesRecord]) -> WindowStats {
    let values: Vec<f64> = history
        .iter()
        .take(window)
        .map(|r| r.qty_sold as f64)
        .collect();
    WindowStats {
        window,
        sample_size: values.len(),
        p25: percentile(&values, 25.0).unwrap_or_default(),
        median: median(&values).unwrap_or_default(),
        p75: percentile(&values, 75.0).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::week_key;
    use proptest::prelude::*;

    fn report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("date")
    }

    /// Records ending the day before the report date, most recent first.
    fn history(sku: &str, qty_most_recent_first: &[u64]) -> Vec<SalesRecord> {
        qty_most_recent_first
            .iter()
            .enumerate()
            .map(|(i, &qty)| {
                let order_date = report_date() - chrono::Days::new(i as u64 + 1);
                SalesRecord {
                    partition_date: report_date(),
                    order_date,
                    sku: sku.to_string(),
                    sku_name: "Original - Large Bag (320 g)".to_string(),
                    qty_sold: qty,
                    week: week_key(order_date),
                }
            })
            .collect()
    }

    #[test]
    fn seven_day_window_quartiles() {
        let records = history("OR-L", &[10, 12, 9, 11, 10, 13, 8]);
        let refs: Vec<&SalesRecord> = records.iter().collect();
        let forecaster = Forecaster::new(vec![7]).expect("forecaster");

        let forecast = forecaster
            .forecast("Original - Large Bag (320 g)", &refs, report_date())
            .expect("forecast");

        let week = &forecast.windows[0];
        assert_eq!(week.sample_size, 7);
        assert_eq!(week.p25, 9.5);
        assert_eq!(week.median, 10.0);
        assert_eq!(week.p75, 11.5);
        assert_eq!(forecast.lower_bound, 10.0);
        assert_eq!(forecast.upper_bound, 11.5);
        assert_eq!(forecast.forecast, FORECAST_LABEL);
        assert_eq!(forecast.partition_date, report_date());
    }

    #[test]
    fn bounds_blend_all_windows() {
        // 7 records of 20 followed by 53 records of 2.
        let mut qty = vec![20; 7];
        qty.extend(std::iter::repeat(2).take(53));
        let records = history("OR-L", &qty);
        let refs: Vec<&SalesRecord> = records.iter().collect();
        let forecaster = Forecaster::new(vec![7, 14, 30, 60]).expect("forecaster");

        let forecast = forecaster
            .forecast("Original - Large Bag (320 g)", &refs, report_date())
            .expect("forecast");

        let medians: Vec<f64> = forecast.windows.iter().map(|w| w.median).collect();
        assert_eq!(medians, vec![20.0, 11.0, 2.0, 2.0]);
        assert_eq!(forecast.lower_bound, 6.5);
        let p75s: Vec<f64> = forecast.windows.iter().map(|w| w.p75).collect();
        assert_eq!(p75s, vec![20.0, 20.0, 2.0, 2.0]);
        assert_eq!(forecast.upper_bound, 11.0);
    }

    #[test]
    fn short_history_uses_what_exists() {
        let records = history("OR-L", &[5]);
        let refs: Vec<&SalesRecord> = records.iter().collect();
        let forecast = Forecaster::new(vec![7, 14, 30, 60])
            .and_then(|f| f.forecast("Original - Large Bag (320 g)", &refs, report_date()))
            .expect("forecast");

        assert!(forecast.windows.iter().all(|w| w.sample_size == 1));
        assert_eq!(forecast.lower_bound, 5.0);
        assert_eq!(forecast.upper_bound, 5.0);
    }

    #[test]
    fn sku_comes_from_most_recent_record() {
        let mut records = history("NEW-SKU", &[3, 4]);
        records[1].sku = "OLD-SKU".to_string();
        let refs: Vec<&SalesRecord> = records.iter().collect();
        let forecast = Forecaster::new(vec![7])
            .and_then(|f| f.forecast("Original - Large Bag (320 g)", &refs, report_date()))
            .expect("forecast");
        assert_eq!(forecast.sku, "NEW-SKU");
    }

    #[test]
    fn empty_history_is_typed_error() {
        let err = Forecaster::new(vec![7])
            .and_then(|f| f.forecast("Vanilla Bean - Large Bag (320 g)", &[], report_date()))
            .unwrap_err();
        assert!(matches!(err, ReportError::NoSalesHistory { ref product } if product.starts_with("Vanilla")));
    }

    #[test]
    fn rejects_bad_windows() {
        assert!(Forecaster::new(vec![]).is_err());
        assert!(Forecaster::new(vec![7, 0]).is_err());
    }

    proptest! {
        #[test]
        fn lower_bound_never_exceeds_upper_bound(qty in prop::collection::vec(0u64..400, 1..150)) {
            let records = history("SKU", &qty);
            let refs: Vec<&SalesRecord> = records.iter().collect();
            let forecast = Forecaster::new(vec![7, 14, 30, 60])
                .and_then(|f| f.forecast("Original - Large Bag (320 g)", &refs, report_date()))
                .expect("forecast");

            prop_assert!(forecast.lower_bound <= forecast.upper_bound);
            for w in &forecast.windows {
                prop_assert!(w.p25 <= w.median && w.median <= w.p75);
            }
        }
    }
}
