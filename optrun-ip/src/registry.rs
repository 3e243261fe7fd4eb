//! Source store handle cache
//!
//! Each physical store is opened at most once per run, keyed by its
//! canonical path. The registry owns every handle; `close_all` releases them
//! and must be called on every exit path of a run.

use optrun_common::db::{Store, StoreOptions};
use optrun_common::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct StoreRegistry {
    options: StoreOptions,
    stores: HashMap<PathBuf, Store>,
}

impl StoreRegistry {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            stores: HashMap::new(),
        }
    }

    /// Canonical (absolute, normalized) form of `path`
    pub fn canonical_path(path: &Path) -> Result<PathBuf> {
        std::fs::canonicalize(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::NotFound(format!("source store {}", path.display()))
            }
            _ => Error::Io(e),
        })
    }

    /// Open `path`, or return the handle opened earlier in this run
    pub async fn open(&mut self, path: &Path) -> Result<&Store> {
        let canonical = Self::canonical_path(path)?;

        if !self.stores.contains_key(&canonical) {
            let store = Store::open(&canonical, &self.options).await?;
            info!("Opened source store {}", canonical.display());
            self.stores.insert(canonical.clone(), store);
        }

        self.stores
            .get(&canonical)
            .ok_or_else(|| Error::NotFound(format!("source store {}", canonical.display())))
    }

    /// Number of distinct stores currently open
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Close every cached handle
    pub async fn close_all(&mut self) {
        for (_, store) in self.stores.drain() {
            store.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn touch_store(path: &Path) {
        let store = Store::open(path, &StoreOptions::output(1000)).await.unwrap();
        store.execute("CREATE TABLE t (x INTEGER)", &[]).await.unwrap();
        store.close().await;
    }

    #[tokio::test]
    async fn test_same_store_opened_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.db");
        touch_store(&path).await;

        let mut registry = StoreRegistry::new(StoreOptions::default());
        registry.open(&path).await.unwrap();

        // Same file through a non-normalized path
        let indirect = dir.path().join(".").join("a.db");
        registry.open(&indirect).await.unwrap();

        assert_eq!(registry.len(), 1);

        registry.close_all().await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut registry = StoreRegistry::new(StoreOptions::default());

        let result = registry.open(&dir.path().join("missing.db")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(registry.is_empty());
    }
}
