use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore};

use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Storage manager over an `object_store` backend rooted at the configured store directory.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
    local_base: Option<PathBuf>,
}

impl StorageManager {
    /// Create a new StorageManager with the specified configuration.
    ///
    /// For the local backend the root directory is created if it does not exist.
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let backend_kind = cfg.storage.clone();
        let (store, local_base) = create_storage_backend(cfg).await?;

        Ok(Self {
            store,
            backend_kind,
            local_base,
        })
    }

    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    /// Access the resolved local base directory when using the local backend.
    pub fn local_base_path(&self) -> Option<&Path> {
        self.local_base.as_deref()
    }

    /// Store bytes at the specified location.
    ///
    /// The local backend stages the payload in a temporary file next to the
    /// destination and renames it into place, so readers never observe a
    /// partially written object.
    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = parse_location(location)?;
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    /// Retrieve bytes from the specified location.
    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = parse_location(location)?;
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    /// Delete all objects below the specified prefix.
    ///
    /// For local filesystem backends, this also attempts to clean up empty directories.
    pub async fn delete_prefix(&self, prefix: &str) -> object_store::Result<()> {
        let prefix_path = parse_location(prefix)?;
        let locations = self
            .store
            .list(Some(&prefix_path))
            .map_ok(|m| m.location)
            .boxed();
        self.store
            .delete_stream(locations)
            .try_collect::<Vec<_>>()
            .await?;

        if matches!(self.backend_kind, StorageKind::Local) {
            self.cleanup_filesystem_directories(prefix).await;
        }

        Ok(())
    }

    /// Check if an object exists at the specified location.
    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = parse_location(location)?;
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }

    /// Best-effort removal of now-empty directories below the base.
    async fn cleanup_filesystem_directories(&self, prefix: &str) {
        let Some(base) = &self.local_base else {
            return;
        };

        let relative = Path::new(prefix);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            tracing::warn!(
                prefix = %prefix,
                "Skipping directory cleanup for unsupported prefix components"
            );
            return;
        }

        let mut current = base.join(relative);

        while current.starts_with(base) && current.as_path() != base.as_path() {
            match tokio::fs::remove_dir(&current).await {
                Ok(()) => {}
                Err(err) => match err.kind() {
                    ErrorKind::NotFound => {}
                    ErrorKind::DirectoryNotEmpty => break,
                    _ => tracing::debug!(
                        error = %err,
                        path = %current.display(),
                        "Failed to remove directory during cleanup"
                    ),
                },
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }
    }
}

fn parse_location(location: &str) -> object_store::Result<ObjPath> {
    ObjPath::parse(location).map_err(|source| object_store::Error::InvalidPath { source })
}

async fn create_storage_backend(
    cfg: &AppConfig,
) -> object_store::Result<(DynStore, Option<PathBuf>)> {
    match cfg.storage {
        StorageKind::Local => {
            let base = resolve_base_dir(cfg);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await.map_err(|e| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: e.into(),
                    }
                })?;
            }
            let store = LocalFileSystem::new_with_prefix(base.clone())?;
            Ok((Arc::new(store), Some(base)))
        }
        StorageKind::Memory => {
            let store = InMemory::new();
            Ok((Arc::new(store), None))
        }
    }
}

/// Resolve the absolute base directory used for local storage from config.
///
/// If `store_dir` is relative, it is resolved against the current working directory.
pub fn resolve_base_dir(cfg: &AppConfig) -> PathBuf {
    let configured = Path::new(&cfg.store_dir);
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(configured)
    }
}

/// Storage fixtures shared by the workspace's tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;

    pub fn test_config_memory() -> AppConfig {
        AppConfig {
            store_dir: "/tmp/unused".into(), // Ignored for memory storage
            storage: StorageKind::Memory,
            ..Default::default()
        }
    }

    pub fn test_config_local(base: &Path) -> AppConfig {
        AppConfig {
            store_dir: base.to_string_lossy().into_owned(),
            storage: StorageKind::Local,
            ..Default::default()
        }
    }

    /// A fresh, isolated in-memory storage manager.
    pub async fn memory_storage() -> object_store::Result<StorageManager> {
        StorageManager::new(&test_config_memory()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_storage_manager_memory_basic_operations() {
        let storage = testing::memory_storage().await.expect("create storage");
        assert!(storage.local_base_path().is_none());

        let location = "abc123/index.json";
        let data = b"{\"format_version\":1}";

        storage
            .put(location, Bytes::from(data.to_vec()))
            .await
            .expect("put");
        let retrieved = storage.get(location).await.expect("get");
        assert_eq!(retrieved.as_ref(), data);

        assert!(storage.exists(location).await.expect("exists check"));

        storage.delete_prefix("abc123").await.expect("delete");
        assert!(!storage
            .exists(location)
            .await
            .expect("exists check after delete"));
    }

    #[tokio::test]
    async fn test_storage_manager_local_basic_operations() {
        let temp = tempfile::tempdir().expect("temp dir");
        let base = temp.path().join("store");
        let cfg = testing::test_config_local(&base);
        let storage = StorageManager::new(&cfg)
            .await
            .expect("create storage manager");
        let resolved_base = storage
            .local_base_path()
            .expect("resolved base dir")
            .to_path_buf();
        assert_eq!(resolved_base, base);

        let location = "video42/index.json";
        let data = b"local index bytes";

        storage
            .put(location, Bytes::from(data.to_vec()))
            .await
            .expect("put");
        let retrieved = storage.get(location).await.expect("get");
        assert_eq!(retrieved.as_ref(), data);

        let object_dir = resolved_base.join("video42");
        tokio::fs::metadata(&object_dir)
            .await
            .expect("object directory exists after write");

        storage.delete_prefix("video42").await.expect("delete");
        assert!(!storage
            .exists(location)
            .await
            .expect("exists check after delete"));
        assert!(
            tokio::fs::metadata(&object_dir).await.is_err(),
            "object directory should be removed"
        );
        tokio::fs::metadata(&resolved_base)
            .await
            .expect("base directory remains intact");
    }

    #[tokio::test]
    async fn test_storage_manager_overwrite_replaces_content() {
        let storage = testing::memory_storage().await.expect("create storage");
        let location = "video/index.json";

        storage
            .put(location, Bytes::from_static(b"first"))
            .await
            .expect("put first");
        storage
            .put(location, Bytes::from_static(b"second"))
            .await
            .expect("put second");

        let retrieved = storage.get(location).await.expect("get");
        assert_eq!(retrieved.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_storage_manager_rejects_traversal_locations() {
        let storage = testing::memory_storage().await.expect("create storage");
        assert!(storage
            .put("../escape/index.json", Bytes::from_static(b"x"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_storage_manager_isolation() {
        let storage1 = testing::memory_storage().await.expect("storage 1");
        let storage2 = testing::memory_storage().await.expect("storage 2");

        storage1
            .put("isolation/index.json", Bytes::from_static(b"one"))
            .await
            .expect("put");

        assert!(!storage2
            .exists("isolation/index.json")
            .await
            .expect("exists check"));
    }

    #[test]
    fn resolve_base_dir_keeps_absolute_paths() {
        let cfg = AppConfig {
            store_dir: "/srv/store".into(),
            ..Default::default()
        };
        assert_eq!(resolve_base_dir(&cfg), PathBuf::from("/srv/store"));
    }
}
