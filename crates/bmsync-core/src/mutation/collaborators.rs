//! Collaborators of the mutation controller
//!
//! The sync transport, the bookmark cache, the view that displays results
//! and the global fault handler are all outside this crate's concern. They
//! are reached through these traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bookmark::{Bookmark, BookmarkChange};
use crate::store::{NativeErrorKind, RoutedStore, StorageError, StorageResult, StoreContent, StoreKey};

/// How far a queued sync reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncType {
    Local,
    LocalAndRemote,
}

/// A unit of work for the sync queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_info: Option<BookmarkChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmarks: Option<Vec<Bookmark>>,
    #[serde(rename = "type")]
    pub sync_type: SyncType,
}

impl SyncRequest {
    /// Remove one bookmark locally and remotely
    pub fn remove(id: i64) -> Self {
        Self {
            change_info: Some(BookmarkChange::remove(id)),
            bookmarks: None,
            sync_type: SyncType::LocalAndRemote,
        }
    }

    /// Replace all bookmarks locally and remotely
    pub fn replace(bookmarks: Vec<Bookmark>) -> Self {
        Self {
            change_info: None,
            bookmarks: Some(bookmarks),
            sync_type: SyncType::LocalAndRemote,
        }
    }

    /// Pull remote changes into local state
    pub fn refresh() -> Self {
        Self {
            change_info: None,
            bookmarks: None,
            sync_type: SyncType::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
}

/// Failures the sync queue can report
#[derive(Error, Debug)]
pub enum SyncError {
    /// The sync this client belonged to no longer exists on the service
    #[error("sync not found")]
    SyncNotFound,

    /// Local data is stale relative to the service
    #[error("local data out of sync")]
    DataOutOfSync,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl From<StorageError> for SyncError {
    fn from(error: StorageError) -> Self {
        SyncError::Failed(error.into())
    }
}

#[async_trait]
pub trait SyncQueue: Send + Sync {
    async fn queue_sync(&self, request: SyncRequest) -> Result<SyncOutcome, SyncError>;
}

/// Source of the currently cached bookmark collection
#[async_trait]
pub trait BookmarkCache: Send + Sync {
    async fn cached_bookmarks(&self) -> StorageResult<Vec<Bookmark>>;
}

/// Bookmark cache kept under the store's Bookmarks key
pub struct StoreBookmarkCache {
    store: Arc<RoutedStore>,
}

impl StoreBookmarkCache {
    pub fn new(store: Arc<RoutedStore>) -> Self {
        Self { store }
    }

    pub async fn update(&self, bookmarks: &[Bookmark]) -> StorageResult<()> {
        let document = serde_json::to_value(bookmarks)?;
        self.store
            .write(StoreKey::Bookmarks, Some(StoreContent::Document(document)))
            .await
    }
}

#[async_trait]
impl BookmarkCache for StoreBookmarkCache {
    async fn cached_bookmarks(&self) -> StorageResult<Vec<Bookmark>> {
        match self.store.read_one(StoreKey::Bookmarks).await? {
            None => Ok(Vec::new()),
            Some(StoreContent::Document(document)) => Ok(serde_json::from_value(document)?),
            Some(_) => Err(StorageError::new(
                NativeErrorKind::UndefinedType,
                "cached bookmarks are not a document",
            )),
        }
    }
}

/// Alert offering to undo a committed deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoAffordance {
    pub message: String,
    pub action: String,
    /// Bookmark collection as cached before the deletion
    pub bookmarks: Vec<Bookmark>,
}

/// The view displaying search results or the bookmark tree
#[async_trait]
pub trait SearchView: Send + Sync {
    /// Reload the default listing from the current source of truth
    async fn display_default_search_state(&self) -> anyhow::Result<()>;

    /// Leave the current view
    async fn switch_view(&self) -> anyhow::Result<()>;

    /// Show the loading overlay
    fn show_working(&self);

    fn show_undo_alert(&self, affordance: UndoAffordance);
}

/// Sink for errors that were not recovered
pub trait FaultHandler: Send + Sync {
    fn handle(&self, error: anyhow::Error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_request_shape() {
        let json = serde_json::to_value(SyncRequest::remove(7)).unwrap();
        assert_eq!(json["type"], "localAndRemote");
        assert_eq!(json["changeInfo"]["changeData"]["id"], 7);
        assert!(json.get("bookmarks").is_none());
    }

    #[test]
    fn test_refresh_request_is_local_only() {
        let request = SyncRequest::refresh();
        assert_eq!(request.sync_type, SyncType::Local);
        assert!(request.change_info.is_none());
    }

    #[test]
    fn test_storage_error_becomes_generic_failure() {
        let err: SyncError = StorageError::new(NativeErrorKind::QueryFailed, "x").into();
        assert!(matches!(err, SyncError::Failed(_)));
    }

    #[tokio::test]
    async fn test_store_cache_round_trip() {
        let cache = StoreBookmarkCache::new(Arc::new(RoutedStore::in_memory()));
        assert!(cache.cached_bookmarks().await.unwrap().is_empty());

        let bookmarks = vec![
            Bookmark::new(1, "https://one.example"),
            Bookmark::folder(2, "Folder", vec![Bookmark::new(3, "https://three.example")]),
        ];
        cache.update(&bookmarks).await.unwrap();

        assert_eq!(cache.cached_bookmarks().await.unwrap(), bookmarks);
    }

    #[tokio::test]
    async fn test_store_cache_rejects_non_documents() {
        let store = Arc::new(RoutedStore::in_memory());
        store
            .write(StoreKey::Bookmarks, Some(StoreContent::from("compressed")))
            .await
            .unwrap();

        let cache = StoreBookmarkCache::new(store);
        let err = cache.cached_bookmarks().await.unwrap_err();
        assert_eq!(err.kind, NativeErrorKind::UndefinedType);
    }
}
