//! Routed store
//!
//! Presents one key/value contract over the primitive plugin and the
//! relational database. Multi-key requests are split by backend, the parts
//! run concurrently, and results are put back in the caller's key order.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{debug, info, warn};

use super::content::{LogOp, StoreContent, TraceLogItem};
use super::error::{NativeErrorKind, StorageError, StorageResult};
use super::key::{Backend, StoreKey};
use super::native::{FileNativeStorage, MemoryNativeStorage, NativeStorage};
use super::primitive::PrimitiveBackend;
use super::structured::StructuredBackend;
use crate::config::Config;

/// Unified key/value façade over both backends
pub struct RoutedStore {
    primitive: PrimitiveBackend,
    structured: StructuredBackend,
}

impl RoutedStore {
    pub fn new(native: Arc<dyn NativeStorage>, structured: StructuredBackend) -> Self {
        Self {
            primitive: PrimitiveBackend::new(native),
            structured,
        }
    }

    /// Open the on-disk store described by `config`
    ///
    /// The database itself is opened lazily on first structured access.
    pub fn open(config: &Config) -> StorageResult<Self> {
        let native = FileNativeStorage::open(config.native_storage_path())?;
        Ok(Self::new(
            Arc::new(native),
            StructuredBackend::open_file(config.database_path()),
        ))
    }

    /// A store that keeps everything in memory
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryNativeStorage::new()),
            StructuredBackend::in_memory(),
        )
    }

    /// Read several keys; the i-th result belongs to `keys[i]`
    ///
    /// Missing values are `None`. The log key always yields `Log`, empty
    /// when nothing has been appended.
    pub async fn read(&self, keys: &[StoreKey]) -> StorageResult<Vec<Option<StoreContent>>> {
        let mut scalar = Vec::new();
        let mut structured = Vec::new();
        let mut log_slots = Vec::new();

        for (slot, key) in keys.iter().copied().enumerate() {
            match key.backend() {
                Backend::Scalar => scalar.push((slot, key)),
                Backend::Structured => structured.push((slot, key)),
                Backend::Log => log_slots.push(slot),
            }
        }
        debug!(
            "Reading {} scalar, {} structured, {} log keys",
            scalar.len(),
            structured.len(),
            log_slots.len()
        );

        let structured_keys: Vec<StoreKey> = structured.iter().map(|&(_, key)| key).collect();

        let scalar_fut = try_join_all(scalar.iter().map(|&(slot, key)| async move {
            self.primitive.get(key).await.map(|value| (slot, value))
        }));
        let structured_fut = self.structured.get_structured(&structured_keys);
        let log_fut = async {
            if log_slots.is_empty() {
                Ok(None)
            } else {
                self.structured.get_log().await.map(Some)
            }
        };

        let (scalar_values, structured_values, log) =
            tokio::try_join!(scalar_fut, structured_fut, log_fut)?;

        let mut results: Vec<Option<StoreContent>> = vec![None; keys.len()];
        for (slot, value) in scalar_values {
            results[slot] = value;
        }
        for ((slot, _), value) in structured.into_iter().zip(structured_values) {
            results[slot] = value;
        }
        if let Some(items) = log {
            for slot in log_slots {
                results[slot] = Some(StoreContent::Log(items.clone()));
            }
        }

        Ok(results)
    }

    pub async fn read_one(&self, key: StoreKey) -> StorageResult<Option<StoreContent>> {
        Ok(self.read(&[key]).await?.into_iter().next().flatten())
    }

    /// Write one key
    ///
    /// For the log key a present value appends one entry and an absent value
    /// clears the whole log. For scalar keys an absent value removes the
    /// entry. For structured keys it empties the column.
    pub async fn write(&self, key: StoreKey, value: Option<StoreContent>) -> StorageResult<()> {
        match key.backend() {
            Backend::Scalar => match value {
                Some(value) => self.primitive.set(key, value).await,
                None => self.primitive.remove(key).await,
            },
            Backend::Log => self.write_log(log_op(value)?).await,
            Backend::Structured => self.structured.set_structured(key, value).await,
        }
    }

    /// Append to or clear the trace log
    pub async fn write_log(&self, op: LogOp) -> StorageResult<()> {
        match op {
            LogOp::Append(item) => self.structured.append_log(item).await,
            LogOp::Clear => self.structured.clear_log().await,
        }
    }

    /// Remove several keys
    ///
    /// Scalar entries are deleted from the plugin; structured columns and
    /// the log are emptied in place.
    pub async fn remove(&self, keys: &[StoreKey]) -> StorageResult<()> {
        let (scalar, other): (Vec<StoreKey>, Vec<StoreKey>) = keys
            .iter()
            .copied()
            .partition(|key| key.backend() == Backend::Scalar);

        let scalar_fut = try_join_all(scalar.into_iter().map(|key| self.primitive.remove(key)));
        let other_fut = try_join_all(other.into_iter().map(|key| self.write(key, None)));

        tokio::try_join!(scalar_fut, other_fut)?;
        Ok(())
    }

    /// Every key that currently exists
    ///
    /// Structured keys and the log key are always present once the schema
    /// exists. Native entries whose names are unknown are skipped.
    pub async fn list_all_keys(&self) -> StorageResult<BTreeSet<StoreKey>> {
        let mut keys: BTreeSet<StoreKey> = StoreKey::STRUCTURED.into_iter().collect();
        keys.insert(StoreKey::TraceLog);

        for name in self.primitive.list_keys().await? {
            match name.parse::<StoreKey>() {
                Ok(key) => {
                    keys.insert(key);
                }
                Err(_) => debug!("Ignoring unknown native key '{}'", name),
            }
        }

        Ok(keys)
    }

    /// Wipe both backends
    ///
    /// Both branches always run to completion. If either fails the call
    /// fails, and the log says which side was left intact.
    pub async fn clear_all(&self) -> StorageResult<()> {
        let (native, structured) = tokio::join!(self.primitive.clear(), self.structured.reset_all());

        match (native, structured) {
            (Ok(()), Ok(())) => {
                info!("Cleared all stored data");
                Ok(())
            }
            (Err(e), Ok(())) => {
                warn!("Partial clear: structured store reset, native store failed: {}", e);
                Err(e)
            }
            (Ok(()), Err(e)) => {
                warn!("Partial clear: native store cleared, structured reset failed: {}", e);
                Err(e)
            }
            (Err(native), Err(structured)) => {
                warn!("Clear failed on both backends: {}; {}", native, structured);
                Err(native)
            }
        }
    }

    /// Convenience for reading the whole trace log
    pub async fn trace_log(&self) -> StorageResult<Vec<TraceLogItem>> {
        self.structured.get_log().await
    }
}

fn log_op(value: Option<StoreContent>) -> StorageResult<LogOp> {
    match value {
        None => Ok(LogOp::Clear),
        Some(StoreContent::LogItem(item)) => Ok(LogOp::Append(item)),
        Some(_) => Err(StorageError::new(
            NativeErrorKind::WrongParameter,
            "trace log accepts a single log item",
        )),
    }
}
