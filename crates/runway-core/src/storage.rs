//! Storage backend abstraction for object storage (S3, local memory).
//!
//! The contract is the small subset of object-store semantics the report
//! publisher needs:
//! - Paged listing by directory-style prefix, in lexicographic key order
//! - Single and batch deletes that tolerate missing objects
//! - Unconditional puts
//!
//! Prefixes are directory-style: `a/b/` matches `a/b/c.csv` but listing the
//! key `a/b/c.csv` itself as a prefix is not portable across backends.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::credentials::AwsCredentials;
use crate::error::{Error, Result};

/// Maximum keys returned by a single list call and accepted by a single batch
/// delete, matching the S3 `ListObjectsV2` / `DeleteObjects` limits.
pub const MAX_KEYS_PER_REQUEST: usize = 1000;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object path (key).
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification timestamp.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag, when the backend reports one.
    pub etag: Option<String>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects in this page, in key order.
    pub objects: Vec<ObjectMeta>,
    /// Key to pass as `start_after` for the next page; `None` when exhausted.
    pub next_start_after: Option<String>,
}

/// Result of a successful put.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutResult {
    /// Entity tag of the written object, if reported.
    pub etag: Option<String>,
    /// Version identifier of the written object, if reported.
    pub version: Option<String>,
}

/// Storage backend trait for object storage.
///
/// All storage backends (S3, memory) implement this trait.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads entire object.
    ///
    /// Returns `Error::NotFound` if object doesn't exist.
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Writes an object unconditionally, replacing any existing content.
    async fn put(&self, path: &str, data: Bytes) -> Result<PutResult>;

    /// Deletes an object.
    ///
    /// Succeeds even if object doesn't exist (idempotent).
    async fn delete(&self, path: &str) -> Result<()>;

    /// Deletes a batch of objects and returns how many deletions were issued.
    ///
    /// Callers keep batches at or below [`MAX_KEYS_PER_REQUEST`].
    async fn delete_many(&self, paths: &[String]) -> Result<usize> {
        for path in paths {
            self.delete(path).await?;
        }
        Ok(paths.len())
    }

    /// Lists up to `max_keys` objects under `prefix` whose key sorts strictly
    /// after `start_after`.
    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage>;

    /// Lists every object under `prefix` by following pages to exhaustion.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let mut objects = Vec::new();
        let mut start_after: Option<String> = None;
        loop {
            let page = self
                .list_page(prefix, start_after.as_deref(), MAX_KEYS_PER_REQUEST)
                .await?;
            objects.extend(page.objects);
            match page.next_start_after {
                Some(next) => start_after = Some(next),
                None => return Ok(objects),
            }
        }
    }

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if object doesn't exist.
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>>;
}

/// In-memory storage backend for testing and dry runs.
///
/// Thread-safe via `RwLock`. Keys are kept sorted so paging is deterministic.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    version: u64,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn meta(&self, path: &str) -> ObjectMeta {
        ObjectMeta {
            path: path.to_string(),
            size: self.data.len() as u64,
            last_modified: Some(self.last_modified),
            etag: Some(format!("\"{}\"", self.version)),
        }
    }
}

fn poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored key, sorted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the lock is poisoned.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.objects.read().map_err(|_| poisoned())?.keys().cloned().collect())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| poisoned())?;

        objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(format!("object not found: {path}")))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<PutResult> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;

        let version = objects.get(path).map_or(1, |o| o.version + 1);
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                version,
                last_modified: Utc::now(),
            },
        );
        drop(objects);

        Ok(PutResult {
            etag: Some(format!("\"{version}\"")),
            version: Some(version.to_string()),
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects.write().map_err(|_| poisoned())?.remove(path);
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        if max_keys == 0 {
            return Err(Error::InvalidInput("max_keys must be positive".into()));
        }
        let objects = self.objects.read().map_err(|_| poisoned())?;

        let lower = start_after.map_or(Bound::Unbounded, |key| Bound::Excluded(key.to_string()));
        let mut matching = objects
            .range((lower, Bound::Unbounded))
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(path, obj)| obj.meta(path));

        let page: Vec<ObjectMeta> = matching.by_ref().take(max_keys).collect();
        let more = matching.next().is_some();

        Ok(ListPage {
            next_start_after: if more {
                page.last().map(|m| m.path.clone())
            } else {
                None
            },
            objects: page,
        })
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects.get(path).map(|obj| obj.meta(path)))
    }
}

/// Storage backend over any [`object_store::ObjectStore`] (S3 in production).
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    label: String,
}

impl ObjectStoreBackend {
    /// Creates an S3 backend for `bucket` in `region` with static credentials.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the S3 client cannot be built.
    pub fn s3(bucket: &str, region: &str, credentials: &AwsCredentials) -> Result<Self> {
        let mut builder = object_store::aws::AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(region)
            .with_access_key_id(credentials.access_key_id())
            .with_secret_access_key(credentials.secret_access_key());
        if let Some(token) = credentials.session_token() {
            builder = builder.with_token(token);
        }

        let store = builder
            .build()
            .map_err(|e| Error::storage_with_source(format!("failed to build S3 client for {bucket}"), e))?;

        Ok(Self {
            store: Arc::new(store),
            label: format!("s3://{bucket}"),
        })
    }

    /// Wraps an existing object store (e.g. `object_store::memory::InMemory`).
    #[must_use]
    pub fn from_store(store: Arc<dyn ObjectStore>, label: impl Into<String>) -> Self {
        Self {
            store,
            label: label.into(),
        }
    }

    /// Human-readable location of the store, e.g. `s3://bucket`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    fn map_error(&self, op: &str, path: &str, err: object_store::Error) -> Error {
        match err {
            object_store::Error::NotFound { .. } => {
                Error::NotFound(format!("object not found: {}/{path}", self.label))
            }
            other => Error::storage_with_source(format!("{op} {}/{path} failed", self.label), other),
        }
    }
}

fn convert_meta(meta: object_store::ObjectMeta) -> ObjectMeta {
    ObjectMeta {
        path: meta.location.to_string(),
        size: u64::try_from(meta.size).unwrap_or(u64::MAX),
        last_modified: Some(meta.last_modified),
        etag: meta.e_tag,
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let location = Path::from(path);
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| self.map_error("get", path, e))?;
        result.bytes().await.map_err(|e| self.map_error("read", path, e))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<PutResult> {
        let location = Path::from(path);
        let result = self
            .store
            .put(&location, PutPayload::from(data))
            .await
            .map_err(|e| self.map_error("put", path, e))?;
        Ok(PutResult {
            etag: result.e_tag,
            version: result.version,
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match self.store.delete(&Path::from(path)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(self.map_error("delete", path, e)),
        }
    }

    async fn delete_many(&self, paths: &[String]) -> Result<usize> {
        let locations = futures::stream::iter(
            paths
                .iter()
                .map(|p| Ok(Path::from(p.as_str())))
                .collect::<Vec<_>>(),
        )
        .boxed();

        let mut results = self.store.delete_stream(locations);
        let mut deleted = 0;
        while let Some(result) = results.next().await {
            match result {
                Ok(_) | Err(object_store::Error::NotFound { .. }) => deleted += 1,
                Err(e) => return Err(self.map_error("batch delete", "", e)),
            }
        }
        Ok(deleted)
    }

    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        if max_keys == 0 {
            return Err(Error::InvalidInput("max_keys must be positive".into()));
        }
        let prefix_path = Path::from(prefix);
        let mut stream = match start_after {
            Some(offset) => self
                .store
                .list_with_offset(Some(&prefix_path), &Path::from(offset)),
            None => self.store.list(Some(&prefix_path)),
        };

        let mut objects = Vec::new();
        let mut more = false;
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| self.map_error("list", prefix, e))?;
            if objects.len() == max_keys {
                more = true;
                break;
            }
            objects.push(convert_meta(meta));
        }
        // S3 lists lexicographically; other stores may not.
        objects.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(ListPage {
            next_start_after: if more {
                objects.last().map(|m| m.path.clone())
            } else {
                None
            },
            objects,
        })
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        match self.store.head(&Path::from(path)).await {
            Ok(meta) => Ok(Some(convert_meta(meta))),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(self.map_error("head", path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        let data = Bytes::from("sku,qty\n");

        let result = backend
            .put("reports/a.csv", data.clone())
            .await
            .expect("put should succeed");
        assert_eq!(result.version.as_deref(), Some("1"));

        let retrieved = backend.get("reports/a.csv").await.expect("get should succeed");
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn test_put_replaces_and_bumps_version() {
        let backend = MemoryBackend::new();
        backend.put("a.csv", Bytes::from("v1")).await.unwrap();
        let result = backend.put("a.csv", Bytes::from("v2")).await.unwrap();

        assert_eq!(result.version.as_deref(), Some("2"));
        assert_eq!(backend.get("a.csv").await.unwrap(), Bytes::from("v2"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("missing.csv").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_page_follows_start_after() {
        let backend = MemoryBackend::new();
        for i in 0..5 {
            backend
                .put(&format!("p/{i}.csv"), Bytes::from("x"))
                .await
                .unwrap();
        }
        backend.put("q/0.csv", Bytes::from("x")).await.unwrap();

        let first = backend.list_page("p/", None, 2).await.unwrap();
        assert_eq!(first.objects.len(), 2);
        assert_eq!(first.next_start_after.as_deref(), Some("p/1.csv"));

        let second = backend
            .list_page("p/", first.next_start_after.as_deref(), 2)
            .await
            .unwrap();
        assert_eq!(second.objects[0].path, "p/2.csv");

        let last = backend.list_page("p/", Some("p/3.csv"), 2).await.unwrap();
        assert_eq!(last.objects.len(), 1);
        assert!(last.next_start_after.is_none());
    }

    #[tokio::test]
    async fn test_list_collects_all_pages() {
        let backend = MemoryBackend::new();
        for i in 0..2_500 {
            backend
                .put(&format!("big/{i:05}.csv"), Bytes::from("x"))
                .await
                .unwrap();
        }

        let all = backend.list("big/").await.unwrap();
        assert_eq!(all.len(), 2_500);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.put("del.csv", Bytes::from("data")).await.unwrap();
        assert!(backend.head("del.csv").await.unwrap().is_some());

        backend.delete("del.csv").await.expect("should succeed");
        backend.delete("del.csv").await.expect("second delete should succeed");
        assert!(backend.head("del.csv").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_object_store_backend_over_in_memory_store() {
        let backend = ObjectStoreBackend::from_store(
            Arc::new(object_store::memory::InMemory::new()),
            "memory://test",
        );

        backend
            .put("r/partition_date=2024-03-01/a.csv", Bytes::from("a"))
            .await
            .unwrap();
        backend
            .put("r/partition_date=2024-03-01/b.csv", Bytes::from("b"))
            .await
            .unwrap();
        backend
            .put("r/partition_date=2024-03-02/c.csv", Bytes::from("c"))
            .await
            .unwrap();

        let page = backend
            .list_page("r/partition_date=2024-03-01/", None, 1)
            .await
            .unwrap();
        assert_eq!(page.objects.len(), 1);
        assert!(page.next_start_after.is_some());

        let listed = backend.list("r/partition_date=2024-03-01/").await.unwrap();
        assert_eq!(listed.len(), 2);

        let keys: Vec<String> = listed.into_iter().map(|m| m.path).collect();
        assert_eq!(backend.delete_many(&keys).await.unwrap(), 2);
        assert!(backend.list("r/partition_date=2024-03-01/").await.unwrap().is_empty());
        assert!(backend.head("r/partition_date=2024-03-02/c.csv").await.unwrap().is_some());
        assert!(backend.get("r/missing.csv").await.unwrap_err().is_not_found());
    }
}
