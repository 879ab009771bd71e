//! Partition-replace publishing of the report artifact.
//!
//! Publishing a date:
//! 1. lists the date's partition and collects every key that starts with the
//!    report object key,
//! 2. deletes them in batches of at most [`MAX_KEYS_PER_REQUEST`], re-listing
//!    until none remain (bounded by `max_delete_rounds`),
//! 3. uploads the freshly serialized CSV at the report key.
//!
//! A failed upload is logged and reported in [`PublishOutcome`]; it does not
//! fail [`ReportPublisher::publish`]. A single writer per date is assumed.

use std::sync::Arc;

use chrono::NaiveDate;
use runway_core::observability::report_span;
use runway_core::{MAX_KEYS_PER_REQUEST, ReportPaths, StorageBackend};
use serde::Serialize;
use tracing::{Instrument, error, info, warn};

use crate::error::{ReportError, Result};
use crate::report::to_csv;
use crate::stockout::InventoryReportRow;

/// Default bound on list-then-delete rounds.
pub const DEFAULT_MAX_DELETE_ROUNDS: usize = 10;

/// Result of the upload step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    /// The object was written.
    Uploaded {
        /// Entity tag reported by the store.
        etag: Option<String>,
    },
    /// The put failed.
    Failed {
        /// Storage error message.
        message: String,
    },
}

/// What a publish did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// Object key of the report.
    pub key: String,
    /// Stale objects deleted before the upload.
    pub stale_deleted: usize,
    /// List-then-delete rounds that found something to delete.
    pub delete_rounds: usize,
    /// Size of the uploaded CSV in bytes.
    pub bytes: usize,
    /// Upload result.
    pub upload: UploadStatus,
}

impl PublishOutcome {
    /// Returns true when the report object was written.
    #[must_use]
    pub const fn is_uploaded(&self) -> bool {
        matches!(self.upload, UploadStatus::Uploaded { .. })
    }
}

/// Writes report artifacts into a bucket.
#[derive(Clone)]
pub struct ReportPublisher {
    storage: Arc<dyn StorageBackend>,
    paths: ReportPaths,
    max_delete_rounds: usize,
}

impl std::fmt::Debug for ReportPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportPublisher")
            .field("paths", &self.paths)
            .field("max_delete_rounds", &self.max_delete_rounds)
            .finish_non_exhaustive()
    }
}

impl ReportPublisher {
    /// Creates a publisher writing under `paths`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, paths: ReportPaths) -> Self {
        Self {
            storage,
            paths,
            max_delete_rounds: DEFAULT_MAX_DELETE_ROUNDS,
        }
    }

    /// Sets the bound on list-then-delete rounds (at least one).
    #[must_use]
    pub fn with_max_delete_rounds(mut self, rounds: usize) -> Self {
        self.max_delete_rounds = rounds.max(1);
        self
    }

    /// Report paths.
    #[must_use]
    pub const fn paths(&self) -> &ReportPaths {
        &self.paths
    }

    /// Replaces the report for `report_date` with `rows`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Csv`] if serialization fails and
    /// [`ReportError::Core`] if stale objects cannot be listed or deleted.
    /// Upload failures are returned inside the outcome.
    pub async fn publish(
        &self,
        report_date: NaiveDate,
        rows: &[InventoryReportRow],
    ) -> Result<PublishOutcome> {
        let span = report_span("publish", report_date);
        self.publish_inner(report_date, rows).instrument(span).await
    }

    async fn publish_inner(
        &self,
        report_date: NaiveDate,
        rows: &[InventoryReportRow],
    ) -> Result<PublishOutcome> {
        let key = self.paths.report_object(report_date);
        let prefix = self.paths.partition_prefix(report_date);
        info!(rows = rows.len(), key = %key, "publishing report");

        let (stale_deleted, delete_rounds) = self.clear_stale(&prefix, &key).await?;

        let body = to_csv(rows)?;
        let bytes = body.len();
        info!(key = %key, bytes, "writing report");

        let upload = match self.storage.put(&key, body).await {
            Ok(result) => {
                info!(key = %key, etag = ?result.etag, "report upload succeeded");
                UploadStatus::Uploaded { etag: result.etag }
            }
            Err(e) => {
                error!(key = %key, error = %e, "report upload failed");
                UploadStatus::Failed {
                    message: e.to_string(),
                }
            }
        };

        Ok(PublishOutcome {
            key,
            stale_deleted,
            delete_rounds,
            bytes,
            upload,
        })
    }

    /// Deletes every object under `prefix` whose key starts with `key`.
    ///
    /// Returns `(objects deleted, rounds that deleted something)`.
    async fn clear_stale(&self, prefix: &str, key: &str) -> Result<(usize, usize)> {
        let mut deleted = 0_usize;
        let mut rounds = 0_usize;

        loop {
            let stale: Vec<String> = self
                .storage
                .list(prefix)
                .await?
                .into_iter()
                .map(|meta| meta.path)
                .filter(|path| path.starts_with(key))
                .collect();

            if stale.is_empty() {
                if rounds == 0 {
                    info!(prefix, "no existing report objects");
                }
                return Ok((deleted, rounds));
            }
            if rounds >= self.max_delete_rounds {
                warn!(prefix, remaining = stale.len(), rounds, "stale objects survived cleanup");
                return Err(ReportError::Core(runway_core::Error::storage(format!(
                    "{} stale objects remain under {prefix} after {rounds} delete rounds",
                    stale.len()
                ))));
            }

            rounds += 1;
            info!(prefix, objects = stale.len(), round = rounds, "deleting existing report objects");
            for batch in stale.chunks(MAX_KEYS_PER_REQUEST) {
                deleted += self.storage.delete_many(batch).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use runway_core::MemoryBackend;

    use crate::stockout::DaysOfStock;

    fn report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("date")
    }

    fn rows(inventory: u64) -> Vec<InventoryReportRow> {
        vec![InventoryReportRow {
            partition_date: report_date(),
            sku: "OR-L".into(),
            sku_name: "Original - Large Bag (320 g)".into(),
            forecast: "forecast_daily".into(),
            lower_bound: 10.0,
            upper_bound: 12.0,
            inventory_on_hand: Some(inventory),
            days_of_stock_onhand: DaysOfStock::compute(Some(inventory), 12.0),
        }]
    }

    #[tokio::test]
    async fn writes_to_partitioned_key() {
        let storage = MemoryBackend::new();
        let publisher =
            ReportPublisher::new(Arc::new(storage.clone()), ReportPaths::shopify_default());

        let outcome = publisher.publish(report_date(), &rows(240)).await.expect("publish");

        assert!(outcome.is_uploaded());
        assert_eq!(outcome.stale_deleted, 0);
        assert_eq!(
            storage.keys().expect("keys"),
            vec!["shopify/inventory_report/partition_date=2024-03-01/shopify_inventory_report_2024-03-01.csv"]
        );
    }

    #[tokio::test]
    async fn keeps_unrelated_objects_in_partition() {
        let storage = MemoryBackend::new();
        let paths = ReportPaths::shopify_default();
        let sibling = format!("{}notes.txt", paths.partition_prefix(report_date()));
        storage.put(&sibling, Bytes::from("keep")).await.expect("put");
        let stale = format!("{}.tmp", paths.report_object(report_date()));
        storage.put(&stale, Bytes::from("old")).await.expect("put");

        let publisher = ReportPublisher::new(Arc::new(storage.clone()), paths);
        let outcome = publisher.publish(report_date(), &rows(1)).await.expect("publish");

        assert_eq!(outcome.stale_deleted, 1);
        let keys = storage.keys().expect("keys");
        assert!(keys.contains(&sibling));
        assert!(!keys.contains(&stale));
        assert_eq!(keys.len(), 2);
    }
}
