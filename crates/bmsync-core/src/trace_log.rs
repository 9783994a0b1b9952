//! Persisted diagnostic trace log
//!
//! Entries are written through the routed store so they survive restarts
//! and can be exported. Each entry is also emitted as a `tracing` event.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{error, trace, warn};

use crate::store::{LogOp, RoutedStore, StorageError, StorageResult, TraceLogItem, TraceLogLevel};

/// Appends entries to the store's trace log
///
/// Timestamps are the primary key of the log table, so they are kept
/// strictly increasing even when several entries land in the same
/// millisecond, and never fall behind the newest persisted entry.
pub struct TraceLogger {
    store: Arc<RoutedStore>,
    last_timestamp: AtomicI64,
    seeded: OnceCell<()>,
}

impl TraceLogger {
    /// Create a logger; the newest persisted timestamp is read on first `log`
    pub fn new(store: Arc<RoutedStore>) -> Self {
        Self {
            store,
            last_timestamp: AtomicI64::new(i64::MIN),
            seeded: OnceCell::new(),
        }
    }

    /// Create a logger that has already read the newest persisted entry
    pub async fn resume(store: Arc<RoutedStore>) -> StorageResult<Self> {
        let logger = Self::new(store);
        logger.seed().await?;
        Ok(logger)
    }

    async fn seed(&self) -> StorageResult<()> {
        self.seeded
            .get_or_try_init(|| async {
                if let Some(item) = self.store.trace_log().await?.last() {
                    self.last_timestamp.fetch_max(item.timestamp, Ordering::SeqCst);
                }
                Ok::<_, StorageError>(())
            })
            .await?;
        Ok(())
    }

    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        now.max(previous.saturating_add(1))
    }

    pub async fn log(&self, level: TraceLogLevel, message: impl Into<String>) -> StorageResult<()> {
        self.seed().await?;

        let message = message.into();
        match level {
            TraceLogLevel::Trace => trace!("{}", message),
            TraceLogLevel::Warn => warn!("{}", message),
            TraceLogLevel::Error => error!("{}", message),
        }

        let item = TraceLogItem::new(self.next_timestamp(), level, message);
        self.store.write_log(LogOp::Append(item)).await
    }

    pub async fn entries(&self) -> StorageResult<Vec<TraceLogItem>> {
        self.store.trace_log().await
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.store.write_log(LogOp::Clear).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rapid_entries_do_not_collide() {
        let logger = TraceLogger::new(Arc::new(RoutedStore::in_memory()));

        for i in 0..50 {
            logger
                .log(TraceLogLevel::Trace, format!("entry {}", i))
                .await
                .unwrap();
        }

        let entries = logger.entries().await.unwrap();
        assert_eq!(entries.len(), 50);
        assert!(entries.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(entries[49].message, "entry 49");
    }

    #[tokio::test]
    async fn test_resume_continues_after_future_entry() {
        let store = Arc::new(RoutedStore::in_memory());
        let future = Utc::now().timestamp_millis() + 60_000;
        store
            .write_log(LogOp::Append(TraceLogItem::new(
                future,
                TraceLogLevel::Warn,
                "from a skewed clock",
            )))
            .await
            .unwrap();

        let logger = TraceLogger::resume(Arc::clone(&store)).await.unwrap();
        logger.log(TraceLogLevel::Error, "after").await.unwrap();

        let entries = logger.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].timestamp, future + 1);
        assert_eq!(entries[1].level, TraceLogLevel::Error);
    }

    #[tokio::test]
    async fn test_new_logger_follows_persisted_future_entry() {
        let store = Arc::new(RoutedStore::in_memory());
        let future = Utc::now().timestamp_millis() + 60_000;
        store
            .write_log(LogOp::Append(TraceLogItem::new(
                future,
                TraceLogLevel::Trace,
                "written by an earlier session",
            )))
            .await
            .unwrap();

        let logger = TraceLogger::new(Arc::clone(&store));
        logger.log(TraceLogLevel::Warn, "next").await.unwrap();
        logger.log(TraceLogLevel::Warn, "after that").await.unwrap();

        let entries = logger.entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].timestamp, future + 1);
        assert_eq!(entries[2].timestamp, future + 2);
    }

    #[tokio::test]
    async fn test_clear_twice() {
        let logger = TraceLogger::new(Arc::new(RoutedStore::in_memory()));
        logger.log(TraceLogLevel::Trace, "a").await.unwrap();

        logger.clear().await.unwrap();
        logger.clear().await.unwrap();
        assert!(logger.entries().await.unwrap().is_empty());
    }
}
