//! Adapter over the primitive key/value plugin

use std::sync::Arc;

use tracing::debug;

use super::content::StoreContent;
use super::error::{StorageError, StorageResult};
use super::key::StoreKey;
use super::native::NativeStorage;

/// Serves scalar keys from the primitive plugin
#[derive(Clone)]
pub struct PrimitiveBackend {
    native: Arc<dyn NativeStorage>,
}

impl PrimitiveBackend {
    pub fn new(native: Arc<dyn NativeStorage>) -> Self {
        Self { native }
    }

    /// Missing values resolve to `None`, not an error
    pub async fn get(&self, key: StoreKey) -> StorageResult<Option<StoreContent>> {
        match self.native.get_item(key.as_str()).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                debug!("No native value for {}", key);
                Ok(None)
            }
            Err(e) => Err(StorageError::from(e)),
        }
    }

    pub async fn set(&self, key: StoreKey, value: StoreContent) -> StorageResult<()> {
        self.native
            .set_item(key.as_str(), value)
            .await
            .map_err(StorageError::from)
    }

    pub async fn remove(&self, key: StoreKey) -> StorageResult<()> {
        self.native
            .remove(key.as_str())
            .await
            .map_err(StorageError::from)
    }

    /// Raw key names, including any the app no longer knows about
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.native.keys().await.map_err(StorageError::from)
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.native.clear().await.map_err(StorageError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::error::{NativeError, NativeErrorKind};
    use crate::store::native::{MemoryNativeStorage, NativeResult};
    use async_trait::async_trait;

    /// Plugin that fails every call with the given code
    struct FailingStorage(NativeErrorKind);

    #[async_trait]
    impl NativeStorage for FailingStorage {
        async fn get_item(&self, _key: &str) -> NativeResult<StoreContent> {
            Err(NativeError::new(self.0, "boom"))
        }
        async fn set_item(&self, _key: &str, _value: StoreContent) -> NativeResult<()> {
            Err(NativeError::new(self.0, "boom"))
        }
        async fn remove(&self, _key: &str) -> NativeResult<()> {
            Err(NativeError::new(self.0, "boom"))
        }
        async fn keys(&self) -> NativeResult<Vec<String>> {
            Err(NativeError::new(self.0, "boom"))
        }
        async fn clear(&self) -> NativeResult<()> {
            Err(NativeError::new(self.0, "boom"))
        }
    }

    #[tokio::test]
    async fn test_missing_value_is_none() {
        let backend = PrimitiveBackend::new(Arc::new(MemoryNativeStorage::new()));
        assert_eq!(backend.get(StoreKey::DarkModeEnabled).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let backend = PrimitiveBackend::new(Arc::new(MemoryNativeStorage::new()));
        backend
            .set(StoreKey::TelemetryEnabled, StoreContent::Bool(false))
            .await
            .unwrap();
        assert_eq!(
            backend.get(StoreKey::TelemetryEnabled).await.unwrap(),
            Some(StoreContent::Bool(false))
        );
    }

    #[tokio::test]
    async fn test_not_found_from_plugin_is_absorbed() {
        let backend = PrimitiveBackend::new(Arc::new(FailingStorage(NativeErrorKind::ItemNotFound)));
        assert_eq!(backend.get(StoreKey::SyncInfo).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_other_failures_are_wrapped() {
        let backend =
            PrimitiveBackend::new(Arc::new(FailingStorage(NativeErrorKind::NullReference)));

        let err = backend.get(StoreKey::SyncInfo).await.unwrap_err();
        assert_eq!(err.kind, NativeErrorKind::NullReference);

        let err = backend.clear().await.unwrap_err();
        assert_eq!(err.kind, NativeErrorKind::NullReference);
    }

    #[tokio::test]
    async fn test_not_found_on_remove_is_reported() {
        let backend = PrimitiveBackend::new(Arc::new(FailingStorage(NativeErrorKind::ItemNotFound)));
        let err = backend.remove(StoreKey::SyncInfo).await.unwrap_err();
        assert_eq!(err.kind, NativeErrorKind::ItemNotFound);
    }
}
