//! Primitive key/value plugin
//!
//! The store treats the primitive plugin as an external collaborator that
//! only understands scalar values and reports failures as native codes.
//! `FileNativeStorage` persists the keyspace as a JSON map in the data
//! directory; `MemoryNativeStorage` keeps it in process.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::content::StoreContent;
use super::error::{NativeError, NativeErrorKind};

pub type NativeResult<T> = Result<T, NativeError>;

/// Asynchronous primitive key/value plugin
#[async_trait]
pub trait NativeStorage: Send + Sync {
    /// Fails with `ItemNotFound` when the key has no value
    async fn get_item(&self, key: &str) -> NativeResult<StoreContent>;

    async fn set_item(&self, key: &str, value: StoreContent) -> NativeResult<()>;

    async fn remove(&self, key: &str) -> NativeResult<()>;

    async fn keys(&self) -> NativeResult<Vec<String>>;

    async fn clear(&self) -> NativeResult<()>;
}

fn check_primitive(key: &str, value: &StoreContent) -> NativeResult<()> {
    if value.is_primitive() {
        Ok(())
    } else {
        Err(NativeError::new(
            NativeErrorKind::WrongParameter,
            format!("value for '{}' is not a primitive", key),
        ))
    }
}

fn not_found(key: &str) -> NativeError {
    NativeError::new(NativeErrorKind::ItemNotFound, format!("no item for '{}'", key))
}

/// In-process primitive store
#[derive(Debug, Default, Clone)]
pub struct MemoryNativeStorage {
    items: Arc<Mutex<BTreeMap<String, StoreContent>>>,
}

impl MemoryNativeStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NativeStorage for MemoryNativeStorage {
    async fn get_item(&self, key: &str) -> NativeResult<StoreContent> {
        self.items
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| not_found(key))
    }

    async fn set_item(&self, key: &str, value: StoreContent) -> NativeResult<()> {
        check_primitive(key, &value)?;
        self.items.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> NativeResult<()> {
        self.items.lock().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> NativeResult<Vec<String>> {
        Ok(self.items.lock().await.keys().cloned().collect())
    }

    async fn clear(&self) -> NativeResult<()> {
        self.items.lock().await.clear();
        Ok(())
    }
}

/// Primitive store persisted as a JSON object on disk
///
/// The whole map is rewritten on every change with an atomic write, so a
/// crash leaves either the old or the new file, never a torn one.
pub struct FileNativeStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, Value>>,
}

impl FileNativeStorage {
    /// Open the store, loading existing items if the file is present
    pub fn open(path: impl Into<PathBuf>) -> NativeResult<Self> {
        let path = path.into();
        let items = if path.exists() {
            let json = fs::read_to_string(&path).map_err(|e| {
                NativeError::new(
                    NativeErrorKind::NullReference,
                    format!("failed to read {:?}: {}", path, e),
                )
            })?;
            serde_json::from_str(&json)
                .map_err(|e| NativeError::new(NativeErrorKind::JsonError, e.to_string()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `items` while the caller still holds the lock
    async fn persist(&self, items: &BTreeMap<String, Value>) -> NativeResult<()> {
        let data = serde_json::to_vec_pretty(items)
            .map_err(|e| NativeError::new(NativeErrorKind::JsonError, e.to_string()))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || atomic_write(&path, &data))
            .await
            .map_err(|e| NativeError::new(NativeErrorKind::NativeWriteFailed, e.to_string()))?
    }
}

#[async_trait]
impl NativeStorage for FileNativeStorage {
    async fn get_item(&self, key: &str) -> NativeResult<StoreContent> {
        self.items
            .lock()
            .await
            .get(key)
            .cloned()
            .map(StoreContent::from_json)
            .ok_or_else(|| not_found(key))
    }

    async fn set_item(&self, key: &str, value: StoreContent) -> NativeResult<()> {
        check_primitive(key, &value)?;
        let mut items = self.items.lock().await;
        let previous = items.insert(key.to_string(), value.to_json());

        if let Err(e) = self.persist(&items).await {
            // Keep memory consistent with disk
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> NativeResult<()> {
        let mut items = self.items.lock().await;
        if let Some(old) = items.remove(key) {
            if let Err(e) = self.persist(&items).await {
                items.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn keys(&self) -> NativeResult<Vec<String>> {
        Ok(self.items.lock().await.keys().cloned().collect())
    }

    async fn clear(&self) -> NativeResult<()> {
        let mut items = self.items.lock().await;
        let old = std::mem::take(&mut *items);
        if let Err(e) = self.persist(&items).await {
            *items = old;
            return Err(e);
        }
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> NativeResult<()> {
    let write_failed =
        |e: std::io::Error| NativeError::new(NativeErrorKind::NativeWriteFailed, e.to_string());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).map_err(write_failed)?;
    file.write_all(data).map_err(write_failed)?;
    file.sync_all().map_err(write_failed)?;
    fs::rename(&temp_path, path).map_err(write_failed)?;

    Ok(())
}
