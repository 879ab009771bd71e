//! Test storage implementations with operation tracing.
//!
//! Provides in-memory storage that records all operations for test assertions.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use runway_core::error::{Error, Result};
use runway_core::storage::{ListPage, MemoryBackend, ObjectMeta, PutResult, StorageBackend};

/// Record of a storage operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// Get operation.
    Get {
        /// Path that was read.
        path: String,
    },
    /// Head operation (metadata only).
    Head {
        /// Path that was checked.
        path: String,
    },
    /// Put operation.
    Put {
        /// Path that was written.
        path: String,
        /// Size of data written.
        size: usize,
    },
    /// Delete operation.
    Delete {
        /// Path that was deleted.
        path: String,
    },
    /// Batch delete operation.
    DeleteMany {
        /// Number of keys in the batch.
        count: usize,
    },
    /// One page of a listing.
    ListPage {
        /// Prefix that was listed.
        prefix: String,
        /// Continuation key.
        start_after: Option<String>,
    },
}

/// Which operations an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailScope {
    All,
    Put,
}

/// In-memory storage backend with operation tracing.
///
/// Records all operations for later assertion in tests.
#[derive(Debug, Clone, Default)]
pub struct TracingMemoryBackend {
    inner: MemoryBackend,
    operations: Arc<Mutex<Vec<StorageOp>>>,
    fail_paths: Arc<Mutex<Vec<(String, FailScope)>>>,
    sticky_paths: Arc<Mutex<Vec<String>>>,
}

impl TracingMemoryBackend {
    /// Creates a new empty tracing storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StorageOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Injects a failure for every operation on the given path prefix.
    pub fn inject_failure(&self, path: impl Into<String>) {
        self.fail_paths
            .lock()
            .expect("lock")
            .push((path.into(), FailScope::All));
    }

    /// Injects a failure for puts on the given path prefix only.
    pub fn inject_put_failure(&self, path: impl Into<String>) {
        self.fail_paths
            .lock()
            .expect("lock")
            .push((path.into(), FailScope::Put));
    }

    /// Makes deletes under the prefix succeed without removing anything.
    pub fn ignore_deletes(&self, path: impl Into<String>) {
        self.sticky_paths.lock().expect("lock").push(path.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_paths.lock().expect("lock").clear();
        self.sticky_paths.lock().expect("lock").clear();
    }

    /// Returns all stored paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.inner.keys().expect("keys")
    }

    /// Stores `count` objects named `{prefix}{index:05}` with small bodies.
    pub async fn seed(&self, prefix: &str, count: usize) {
        for i in 0..count {
            self.inner
                .put(&format!("{prefix}{i:05}"), Bytes::from_static(b"stale"))
                .await
                .expect("seed put");
        }
    }

    /// Returns the number of recorded operations matching `pred`.
    #[must_use]
    pub fn count_ops(&self, pred: impl Fn(&StorageOp) -> bool) -> usize {
        self.operations
            .lock()
            .expect("lock")
            .iter()
            .filter(|op| pred(op))
            .count()
    }

    fn record(&self, op: StorageOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(&self, path: &str, put: bool) -> Result<()> {
        let fail_paths = self.fail_paths.lock().expect("lock");
        let hit = fail_paths.iter().any(|(p, scope)| {
            path.starts_with(p.as_str()) && (*scope == FailScope::All || put)
        });
        if hit {
            return Err(Error::Internal {
                message: format!("Injected failure for path: {path}"),
            });
        }
        Ok(())
    }

    fn is_sticky(&self, path: &str) -> bool {
        self.sticky_paths
            .lock()
            .expect("lock")
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    }

}

#[async_trait::async_trait]
impl StorageBackend for TracingMemoryBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        self.check_failure(path, false)?;
        self.record(StorageOp::Get {
            path: path.to_string(),
        });
        self.inner.get(path).await
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<PutResult> {
        self.check_failure(path, true)?;
        self.record(StorageOp::Put {
            path: path.to_string(),
            size: data.len(),
        });
        self.inner.put(path, data).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.check_failure(path, false)?;
        self.record(StorageOp::Delete {
            path: path.to_string(),
        });
        if self.is_sticky(path) {
            return Ok(());
        }
        self.inner.delete(path).await
    }

    async fn delete_many(&self, paths: &[String]) -> Result<usize> {
        for path in paths {
            self.check_failure(path, false)?;
        }
        self.record(StorageOp::DeleteMany { count: paths.len() });
        for path in paths.iter().filter(|p| !self.is_sticky(p)) {
            self.inner.delete(path).await?;
        }
        Ok(paths.len())
    }

    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        self.check_failure(prefix, false)?;
        self.record(StorageOp::ListPage {
            prefix: prefix.to_string(),
            start_after: start_after.map(str::to_string),
        });
        self.inner.list_page(prefix, start_after, max_keys).await
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        self.check_failure(path, false)?;
        self.record(StorageOp::Head {
            path: path.to_string(),
        });
        self.inner.head(path).await
    }
}
