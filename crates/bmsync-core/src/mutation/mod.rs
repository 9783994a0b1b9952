//! Optimistic bookmark mutations and the collaborators they reconcile with

pub mod bookmark;
pub mod collaborators;
pub mod controller;

pub use bookmark::{Bookmark, BookmarkChange, BookmarkChangeType, RemoveBookmarkChangeData};
pub use collaborators::{
    BookmarkCache, FaultHandler, SearchView, StoreBookmarkCache, SyncError, SyncOutcome,
    SyncQueue, SyncRequest, SyncType, UndoAffordance,
};
pub use controller::{BookmarkSnapshot, BookmarkView, MutationController, MutationOutcome, Rollback};
