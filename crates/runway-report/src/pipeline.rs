//! One report run: query, forecast, join, publish.

use chrono::{DateTime, Days, NaiveDate, Utc};
use runway_core::observability::report_span;
use runway_warehouse::{QueryExecutor, QueryRequest};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info};

use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::forecast::{Forecaster, RunRateForecast};
use crate::inventory::{InventoryLevels, InventorySnapshot};
use crate::publisher::{PublishOutcome, ReportPublisher};
use crate::queries::{QueryParams, render};
use crate::sales::{CatalogEntry, DroppedRows, SalesHistory};
use crate::stockout::{InventoryReportRow, join_inventory};

/// The report date for a run started at `now`: the previous UTC day.
#[must_use]
pub fn default_report_date(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

/// Everything computed for one report date, before publishing.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    /// Report date.
    pub report_date: NaiveDate,
    /// Earliest and latest order dates in the sales window.
    pub sales_date_range: Option<(NaiveDate, NaiveDate)>,
    /// Sales rows discarded while reading.
    pub dropped_sales_rows: DroppedRows,
    /// Distinct `(sku, sku_name)` pairs sold in the window.
    pub catalog: Vec<CatalogEntry>,
    /// Inventory per sku for the report date.
    pub inventory: Vec<InventorySnapshot>,
    /// One forecast per tracked product, in product order.
    pub forecasts: Vec<RunRateForecast>,
    /// Report rows, one per tracked product, in product order.
    pub rows: Vec<InventoryReportRow>,
}

/// Outcome of [`ReportPipeline::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// The computed report.
    pub report: InventoryReport,
    /// Publish result; `None` for a dry run.
    pub publish: Option<PublishOutcome>,
}

/// Builds reports with a [`QueryExecutor`].
#[derive(Debug)]
pub struct ReportPipeline<E> {
    executor: E,
    config: ReportConfig,
    forecaster: Forecaster,
}

impl<E: QueryExecutor> ReportPipeline<E> {
    /// Creates a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`](crate::ReportError::Config) if the
    /// configuration is invalid.
    pub fn new(executor: E, config: ReportConfig) -> Result<Self> {
        config.validate()?;
        let forecaster = Forecaster::new(config.windows.clone())?;
        Ok(Self {
            executor,
            config,
            forecaster,
        })
    }

    /// The executor.
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// The configuration.
    pub const fn config(&self) -> &ReportConfig {
        &self.config
    }

    fn request(
        &self,
        label: &str,
        template: &str,
        database: &str,
        report_date: NaiveDate,
    ) -> Result<QueryRequest> {
        let query = render(
            template,
            &QueryParams {
                lookback_days: self.config.lookback_days,
                report_date,
            },
        )?;
        let mut request =
            QueryRequest::new(label, query, database, &self.config.query_output_location)?;
        if let Some(work_group) = &self.config.work_group {
            request = request.with_work_group(work_group);
        }
        Ok(request)
    }

    /// Queries sales and inventory and computes the report for `report_date`.
    ///
    /// # Errors
    ///
    /// Fails on any query error, malformed result row, or a tracked product
    /// without sales history.
    pub async fn build_report(
        &self,
        report_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<InventoryReport> {
        self.build_inner(report_date, cancel)
            .instrument(report_span("build", report_date))
            .await
    }

    async fn build_inner(
        &self,
        report_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<InventoryReport> {
        let sales_request = self.request(
            "sales",
            &self.config.sales_query,
            &self.config.sales_database,
            report_date,
        )?;
        let sales = self.executor.execute(&sales_request, cancel).await?;
        let history = SalesHistory::from_table(sales)?;

        let inventory_request = self.request(
            "inventory",
            &self.config.inventory_query,
            &self.config.inventory_database,
            report_date,
        )?;
        let inventory = self.executor.execute(&inventory_request, cancel).await?;
        let inventory = InventoryLevels::from_table(inventory, report_date)?;

        let forecasts = self
            .config
            .products
            .iter()
            .map(|product| {
                self.forecaster
                    .forecast(product, &history.for_product(product), report_date)
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = join_inventory(&forecasts, &inventory);
        info!(
            products = forecasts.len(),
            matched_inventory = rows.iter().filter(|r| r.inventory_on_hand.is_some()).count(),
            "built inventory report"
        );

        Ok(InventoryReport {
            report_date,
            sales_date_range: history.date_range(),
            dropped_sales_rows: history.dropped(),
            catalog: history.catalog(),
            inventory: inventory.snapshots(),
            forecasts,
            rows,
        })
    }

    /// Builds the report and, unless `dry_run`, publishes it.
    ///
    /// # Errors
    ///
    /// See [`build_report`](Self::build_report) and
    /// [`ReportPublisher::publish`]. Returns [`ReportError::Cancelled`] if
    /// `cancel` fired after the report was built and before publishing.
    pub async fn run(
        &self,
        publisher: &ReportPublisher,
        report_date: NaiveDate,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let report = self.build_report(report_date, cancel).await?;
        let publish = if dry_run {
            info!(
                key = %publisher.paths().report_object(report_date),
                "dry run, skipping publish"
            );
            None
        } else if cancel.is_cancelled() {
            return Err(ReportError::Cancelled { report_date });
        } else {
            Some(publisher.publish(report_date, &report.rows).await?)
        };
        Ok(RunSummary { report, publish })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn report_date_is_previous_utc_day() {
        let now = Utc
            .with_ymd_and_hms(2024, 3, 1, 0, 30, 0)
            .single()
            .expect("time");
        assert_eq!(
            default_report_date(now),
            NaiveDate::from_ymd_opt(2024, 2, 29).expect("date")
        );
    }
}
