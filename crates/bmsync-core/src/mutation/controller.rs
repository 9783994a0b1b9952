//! Optimistic bookmark mutations
//!
//! A deletion is applied to the displayed state first, then queued for sync.
//! The queue's reply decides whether the edit is kept, replaced by a fresh
//! listing, or rolled back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::bookmark::{remove_from_list, remove_from_tree, Bookmark};
use super::collaborators::{
    BookmarkCache, FaultHandler, SearchView, SyncError, SyncQueue, SyncRequest, UndoAffordance,
};
use crate::config::Config;

/// Alert text shown once a deletion is committed
pub const BOOKMARK_DELETED_MESSAGE: &str = "Bookmark deleted";

/// Label of the undo action
pub const UNDO_ACTION_LABEL: &str = "Undo";

/// State visible to the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkView {
    /// Whether the bookmark tree is displayed instead of search results
    pub folder_view: bool,
    pub tree: Vec<Bookmark>,
    pub results: Vec<Bookmark>,
}

impl BookmarkView {
    pub fn with_results(results: Vec<Bookmark>) -> Self {
        Self {
            folder_view: false,
            tree: Vec::new(),
            results,
        }
    }

    pub fn with_tree(tree: Vec<Bookmark>) -> Self {
        Self {
            folder_view: true,
            tree,
            results: Vec::new(),
        }
    }

    /// Deep copy of whichever collection is displayed
    pub fn snapshot(&self) -> BookmarkSnapshot {
        if self.folder_view {
            BookmarkSnapshot::Tree(self.tree.clone())
        } else {
            BookmarkSnapshot::Results(self.results.clone())
        }
    }

    /// Remove a bookmark from the displayed collection
    pub fn remove(&mut self, id: i64) -> bool {
        if self.folder_view {
            remove_from_tree(&mut self.tree, id)
        } else {
            remove_from_list(&mut self.results, id)
        }
    }

    /// Write a snapshot back into the collection it was taken from
    pub fn restore(&mut self, snapshot: BookmarkSnapshot) {
        match snapshot {
            BookmarkSnapshot::Tree(tree) => self.tree = tree,
            BookmarkSnapshot::Results(results) => self.results = results,
        }
    }
}

/// Pre-mutation copy of the displayed collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkSnapshot {
    Tree(Vec<Bookmark>),
    Results(Vec<Bookmark>),
}

/// How a failed mutation was rolled back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    /// The view was left; nothing was restored
    NavigatedAway,
    /// The snapshot was written back
    SnapshotRestored,
}

/// Terminal state of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Synced; an undo alert was presented
    Committed,
    /// The queue replied without confirming the change
    NotConfirmed,
    /// Local data was stale; the listing was reloaded instead
    Deferred,
    RolledBack(Rollback),
}

/// Applies bookmark edits optimistically and reconciles them with the sync queue
pub struct MutationController {
    view: Arc<Mutex<BookmarkView>>,
    host: Arc<dyn SearchView>,
    sync: Arc<dyn SyncQueue>,
    cache: Arc<dyn BookmarkCache>,
    faults: Arc<dyn FaultHandler>,
    mutation_delay: Duration,
    interface_ready_timeout: Duration,
}

impl MutationController {
    pub fn new(
        view: Arc<Mutex<BookmarkView>>,
        host: Arc<dyn SearchView>,
        sync: Arc<dyn SyncQueue>,
        cache: Arc<dyn BookmarkCache>,
        faults: Arc<dyn FaultHandler>,
    ) -> Self {
        let defaults = Config::default();
        Self {
            view,
            host,
            sync,
            cache,
            faults,
            mutation_delay: defaults.mutation_delay(),
            interface_ready_timeout: defaults.interface_ready_timeout(),
        }
    }

    /// Take UI timing from configuration
    pub fn with_config(self, config: &Config) -> Self {
        self.with_timing(config.mutation_delay(), config.interface_ready_timeout())
    }

    pub fn with_timing(mut self, mutation_delay: Duration, interface_ready_timeout: Duration) -> Self {
        self.mutation_delay = mutation_delay;
        self.interface_ready_timeout = interface_ready_timeout;
        self
    }

    pub fn view(&self) -> Arc<Mutex<BookmarkView>> {
        Arc::clone(&self.view)
    }

    /// Delete a bookmark from the displayed state and sync the removal
    ///
    /// Failures are reported to the fault handler after the local recovery
    /// step has run; the returned outcome names which step that was.
    pub async fn delete_bookmark(&self, id: i64) -> MutationOutcome {
        let snapshot = {
            let mut view = self.view.lock().await;
            let snapshot = view.snapshot();
            if !view.remove(id) {
                debug!("Bookmark {} not in displayed state", id);
            }
            snapshot
        };
        debug!("Removal of bookmark {} applied", id);

        pause(self.mutation_delay).await;
        self.host.show_working();

        let undo_bookmarks = match self.cache.cached_bookmarks().await {
            Ok(bookmarks) => bookmarks,
            Err(e) => return self.reconcile_failure(id, SyncError::from(e), snapshot).await,
        };

        debug!("Removal of bookmark {} queued", id);
        match self.sync.queue_sync(SyncRequest::remove(id)).await {
            Ok(outcome) if outcome.success => {
                info!("Removal of bookmark {} committed", id);
                pause(self.interface_ready_timeout).await;
                self.host.show_undo_alert(UndoAffordance {
                    message: BOOKMARK_DELETED_MESSAGE.to_string(),
                    action: UNDO_ACTION_LABEL.to_string(),
                    bookmarks: undo_bookmarks,
                });
                MutationOutcome::Committed
            }
            Ok(_) => {
                debug!("Removal of bookmark {} not confirmed by sync queue", id);
                MutationOutcome::NotConfirmed
            }
            Err(e) => self.reconcile_failure(id, e, snapshot).await,
        }
    }

    async fn reconcile_failure(
        &self,
        id: i64,
        error: SyncError,
        snapshot: BookmarkSnapshot,
    ) -> MutationOutcome {
        let (outcome, recovery) = match error {
            SyncError::SyncNotFound => {
                warn!("Sync for bookmark {} removal no longer exists, leaving view", id);
                let recovery = self.host.switch_view().await;
                (MutationOutcome::RolledBack(Rollback::NavigatedAway), recovery)
            }
            SyncError::DataOutOfSync => {
                warn!("Local data out of sync while removing bookmark {}, refreshing", id);
                let recovery = self.host.display_default_search_state().await;
                (MutationOutcome::Deferred, recovery)
            }
            SyncError::Failed(_) => {
                warn!("Removal of bookmark {} failed, restoring snapshot", id);
                self.view.lock().await.restore(snapshot);
                (MutationOutcome::RolledBack(Rollback::SnapshotRestored), Ok(()))
            }
        };

        if let Err(e) = recovery {
            self.faults.handle(e);
        }
        self.faults.handle(anyhow::Error::from(error));
        outcome
    }

    /// Re-submit the bookmarks captured before a deletion
    ///
    /// The default listing is reloaded whether or not the sync succeeds.
    pub async fn undo(&self, affordance: UndoAffordance) -> Result<(), SyncError> {
        info!("Undoing bookmark deletion");
        let queued = self
            .sync
            .queue_sync(SyncRequest::replace(affordance.bookmarks))
            .await;
        let refreshed = self.host.display_default_search_state().await;
        queued?;
        refreshed?;
        Ok(())
    }

    /// Pull remote changes and reload the default listing
    pub async fn refresh(&self) -> Result<(), SyncError> {
        self.sync.queue_sync(SyncRequest::refresh()).await?;
        self.host.display_default_search_state().await?;
        Ok(())
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
