//! Adapter over the embedded relational database
//!
//! The connection is opened on first use and kept for the life of the
//! backend. Concurrent first callers all await the same open. SQLite calls
//! are blocking, so each unit of work runs on the blocking pool while
//! holding the connection's lock.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::content::{StoreContent, TraceLogItem, TraceLogLevel};
use super::error::{NativeErrorKind, StorageError, StorageResult};
use super::key::{Backend, StoreKey};
use super::schema::{
    adopt_schema, init_schema, needs_init, needs_upgrade, APP_ROW_ID, APP_TABLE, TRACE_LOG_TABLE,
};

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

type SharedConnection = Arc<Mutex<Connection>>;

/// Serves structured keys and the trace log
pub struct StructuredBackend {
    location: DatabaseLocation,
    db: OnceCell<SharedConnection>,
}

impl StructuredBackend {
    pub fn new(location: DatabaseLocation) -> Self {
        Self {
            location,
            db: OnceCell::new(),
        }
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::new(DatabaseLocation::File(path.into()))
    }

    pub fn in_memory() -> Self {
        Self::new(DatabaseLocation::Memory)
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Whether the database handle has been opened yet
    pub fn is_open(&self) -> bool {
        self.db.initialized()
    }

    async fn connection(&self) -> StorageResult<SharedConnection> {
        let conn = self
            .db
            .get_or_try_init(|| async {
                let location = self.location.clone();
                let conn = tokio::task::spawn_blocking(move || open_connection(&location)).await??;
                Ok::<_, StorageError>(Arc::new(Mutex::new(conn)))
            })
            .await?;
        Ok(Arc::clone(conn))
    }

    /// Run blocking work against the open connection
    async fn with_conn<F, T>(&self, work: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection().await?;
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| {
                StorageError::new(NativeErrorKind::Unavailable, "database lock poisoned")
            })?;
            work(&mut guard)
        })
        .await?
    }

    /// Read the requested structured columns from the app row, in request order
    pub async fn get_structured(
        &self,
        keys: &[StoreKey],
    ) -> StorageResult<Vec<Option<StoreContent>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        for key in keys {
            ensure_structured(*key)?;
        }

        let columns: Vec<String> = keys
            .iter()
            .map(|key| format!("\"{}\"", key.as_str()))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            columns.join(", "),
            APP_TABLE
        );
        let count = keys.len();

        let raw: Vec<Option<String>> = self
            .with_conn(move |conn| {
                conn.query_row(&sql, params![APP_ROW_ID], |row| {
                    (0..count)
                        .map(|i| row.get::<_, Option<String>>(i))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })
                .map_err(|e| StorageError::from_sql(NativeErrorKind::QueryFailed, e))
            })
            .await?;

        Ok(raw
            .into_iter()
            .map(|column| column.map(decode_column))
            .collect())
    }

    /// Update one structured column; `None` clears it
    pub async fn set_structured(
        &self,
        key: StoreKey,
        value: Option<StoreContent>,
    ) -> StorageResult<()> {
        ensure_structured(key)?;
        let encoded = value.as_ref().map(serde_json::to_string).transpose()?;
        let sql = format!(
            "UPDATE {} SET \"{}\" = ?1 WHERE id = ?2",
            APP_TABLE,
            key.as_str()
        );

        debug!("Updating structured column {}", key);
        self.with_conn(move |conn| {
            conn.execute(&sql, params![encoded, APP_ROW_ID])
                .map(|_| ())
                .map_err(|e| StorageError::from_sql(NativeErrorKind::QueryFailed, e))
        })
        .await
    }

    /// All log entries, oldest first
    pub async fn get_log(&self) -> StorageResult<Vec<TraceLogItem>> {
        self.with_conn(|conn| {
            let query = || -> rusqlite::Result<Vec<TraceLogItem>> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT timestamp, level, message FROM {} ORDER BY timestamp",
                    TRACE_LOG_TABLE
                ))?;
                let rows = stmt.query_map([], |row| {
                    Ok(TraceLogItem {
                        timestamp: row.get(0)?,
                        level: TraceLogLevel::from_i64(row.get::<_, Option<i64>>(1)?.unwrap_or(0)),
                        message: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            };
            query().map_err(|e| StorageError::from_sql(NativeErrorKind::QueryFailed, e))
        })
        .await
    }

    pub async fn append_log(&self, item: TraceLogItem) -> StorageResult<()> {
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (timestamp, level, message) VALUES (?1, ?2, ?3)",
                    TRACE_LOG_TABLE
                ),
                params![item.timestamp, item.level.as_i64(), item.message],
            )
            .map(|_| ())
            .map_err(|e| StorageError::from_sql(NativeErrorKind::QueryFailed, e))
        })
        .await
    }

    pub async fn clear_log(&self) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute(&format!("DELETE FROM {}", TRACE_LOG_TABLE), [])
                .map(|_| ())
                .map_err(|e| StorageError::from_sql(NativeErrorKind::QueryFailed, e))
        })
        .await
    }

    /// Drop and recreate both tables and the seed row
    pub async fn reset_all(&self) -> StorageResult<()> {
        self.with_conn(|conn| {
            init_schema(conn)
                .map_err(|e| StorageError::from_sql(NativeErrorKind::TransactionFailed, e))
        })
        .await?;
        info!("Structured store reset");
        Ok(())
    }
}

fn ensure_structured(key: StoreKey) -> StorageResult<()> {
    if key.backend() == Backend::Structured {
        Ok(())
    } else {
        Err(StorageError::new(
            NativeErrorKind::WrongParameter,
            format!("'{}' is not a structured key", key),
        ))
    }
}

/// Decode a column written by this crate, or keep foreign text as-is
///
/// Earlier releases stored raw strings (e.g. compressed bookmarks) that are
/// not tagged JSON.
fn decode_column(text: String) -> StoreContent {
    match serde_json::from_str(&text) {
        Ok(content) => content,
        Err(_) => {
            debug!("Column holds untagged text, returning it verbatim");
            StoreContent::Text(text)
        }
    }
}

fn open_connection(location: &DatabaseLocation) -> StorageResult<Connection> {
    let open_failed = |e| StorageError::from_sql(NativeErrorKind::OpenFailed, e);

    let mut conn = match location {
        DatabaseLocation::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::with_source(NativeErrorKind::OpenFailed, e))?;
            }
            Connection::open(path).map_err(open_failed)?
        }
        DatabaseLocation::Memory => Connection::open_in_memory().map_err(open_failed)?,
    };

    if needs_init(&conn) {
        init_schema(&mut conn)
            .map_err(|e| StorageError::from_sql(NativeErrorKind::TransactionFailed, e))?;
        info!("Initialized database schema at {:?}", location);
    } else if needs_upgrade(&conn) {
        adopt_schema(&mut conn)
            .map_err(|e| StorageError::from_sql(NativeErrorKind::TransactionFailed, e))?;
        info!("Adopted existing database at {:?}", location);
    } else {
        debug!("Opened existing database at {:?}", location);
    }

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_opens_lazily() {
        let backend = StructuredBackend::in_memory();
        assert!(!backend.is_open());

        // Empty requests never touch the database
        assert!(backend.get_structured(&[]).await.unwrap().is_empty());
        assert!(!backend.is_open());

        backend.get_log().await.unwrap();
        assert!(backend.is_open());
    }

    #[tokio::test]
    async fn test_fresh_columns_are_empty() {
        let backend = StructuredBackend::in_memory();
        let values = backend
            .get_structured(&[StoreKey::Bookmarks, StoreKey::RemovedSync])
            .await
            .unwrap();
        assert_eq!(values, vec![None, None]);
    }

    #[tokio::test]
    async fn test_set_and_get_preserves_request_order() {
        let backend = StructuredBackend::in_memory();
        let bookmarks = StoreContent::Document(json!([{"id": 1}]));
        let removed = StoreContent::Document(json!([{"id": 9}]));

        backend
            .set_structured(StoreKey::Bookmarks, Some(bookmarks.clone()))
            .await
            .unwrap();
        backend
            .set_structured(StoreKey::RemovedSync, Some(removed.clone()))
            .await
            .unwrap();

        let values = backend
            .get_structured(&[StoreKey::RemovedSync, StoreKey::Bookmarks])
            .await
            .unwrap();
        assert_eq!(values, vec![Some(removed), Some(bookmarks)]);
    }

    #[tokio::test]
    async fn test_set_none_clears_column() {
        let backend = StructuredBackend::in_memory();
        backend
            .set_structured(StoreKey::Bookmarks, Some(StoreContent::from("compressed")))
            .await
            .unwrap();
        backend
            .set_structured(StoreKey::Bookmarks, None)
            .await
            .unwrap();

        let values = backend.get_structured(&[StoreKey::Bookmarks]).await.unwrap();
        assert_eq!(values, vec![None]);
    }

    #[tokio::test]
    async fn test_rejects_non_structured_keys() {
        let backend = StructuredBackend::in_memory();

        let err = backend
            .get_structured(&[StoreKey::TraceLog])
            .await
            .unwrap_err();
        assert_eq!(err.kind, NativeErrorKind::WrongParameter);

        let err = backend
            .set_structured(StoreKey::DarkModeEnabled, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, NativeErrorKind::WrongParameter);
    }

    #[tokio::test]
    async fn test_log_is_ordered_by_timestamp() {
        let backend = StructuredBackend::in_memory();
        backend
            .append_log(TraceLogItem::new(30, TraceLogLevel::Error, "third"))
            .await
            .unwrap();
        backend
            .append_log(TraceLogItem::new(10, TraceLogLevel::Trace, "first"))
            .await
            .unwrap();
        backend
            .append_log(TraceLogItem::new(20, TraceLogLevel::Warn, "second"))
            .await
            .unwrap();

        let log = backend.get_log().await.unwrap();
        let messages: Vec<_> = log.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(log[2].level, TraceLogLevel::Error);
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_is_query_failure() {
        let backend = StructuredBackend::in_memory();
        let item = TraceLogItem::new(5, TraceLogLevel::Trace, "a");
        backend.append_log(item.clone()).await.unwrap();

        let err = backend.append_log(item).await.unwrap_err();
        assert_eq!(err.kind, NativeErrorKind::QueryFailed);
    }

    #[tokio::test]
    async fn test_clear_log_is_idempotent() {
        let backend = StructuredBackend::in_memory();
        backend
            .append_log(TraceLogItem::new(1, TraceLogLevel::Trace, "a"))
            .await
            .unwrap();

        backend.clear_log().await.unwrap();
        let once = backend.get_log().await.unwrap();
        backend.clear_log().await.unwrap();
        let twice = backend.get_log().await.unwrap();

        assert!(once.is_empty());
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_reset_all() {
        let backend = StructuredBackend::in_memory();
        backend
            .set_structured(StoreKey::Bookmarks, Some(StoreContent::Document(json!([]))))
            .await
            .unwrap();
        backend
            .append_log(TraceLogItem::new(1, TraceLogLevel::Trace, "a"))
            .await
            .unwrap();

        backend.reset_all().await.unwrap();

        assert_eq!(
            backend.get_structured(&[StoreKey::Bookmarks]).await.unwrap(),
            vec![None]
        );
        assert!(backend.get_log().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_first_access_shares_one_handle() {
        let backend = Arc::new(StructuredBackend::in_memory());

        // In-memory databases are per-connection, so a second open would
        // lose the write below.
        let writers = (0..8).map(|i| {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                backend
                    .append_log(TraceLogItem::new(i, TraceLogLevel::Trace, format!("w{}", i)))
                    .await
            })
        });
        for handle in futures_util::future::join_all(writers).await {
            handle.unwrap().unwrap();
        }

        assert_eq!(backend.get_log().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("xbs.db");

        {
            let backend = StructuredBackend::open_file(&path);
            backend
                .set_structured(StoreKey::RemovedSync, Some(StoreContent::Document(json!([3]))))
                .await
                .unwrap();
        }

        let backend = StructuredBackend::open_file(&path);
        assert_eq!(
            backend.get_structured(&[StoreKey::RemovedSync]).await.unwrap(),
            vec![Some(StoreContent::Document(json!([3])))]
        );
    }

    #[tokio::test]
    async fn test_existing_database_keeps_its_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("xbs.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE app (id INTEGER PRIMARY KEY, bookmarks TEXT, removedSync TEXT);
                INSERT INTO app (id, bookmarks) VALUES (1, 'N4IgLgpgTg');
                CREATE TABLE traceLog (timestamp INTEGER PRIMARY KEY, level INTEGER, message TEXT);
                INSERT INTO traceLog (timestamp, level, message) VALUES (5, 1, 'before upgrade');
                "#,
            )
            .unwrap();
        }

        let backend = StructuredBackend::open_file(&path);
        let log = backend.get_log().await.unwrap();
        assert_eq!(log, vec![TraceLogItem::new(5, TraceLogLevel::Warn, "before upgrade")]);
        assert_eq!(
            backend.get_structured(&[StoreKey::Bookmarks]).await.unwrap(),
            vec![Some(StoreContent::from("N4IgLgpgTg"))]
        );

        // Writes still work against the adopted row
        backend
            .set_structured(StoreKey::RemovedSync, Some(StoreContent::Document(json!([2]))))
            .await
            .unwrap();
        drop(backend);

        let backend = StructuredBackend::open_file(&path);
        assert_eq!(backend.get_log().await.unwrap().len(), 1);
        assert_eq!(
            backend.get_structured(&[StoreKey::RemovedSync]).await.unwrap(),
            vec![Some(StoreContent::Document(json!([2])))]
        );
    }

    #[tokio::test]
    async fn test_untagged_column_text_is_returned_verbatim() {
        let backend = StructuredBackend::in_memory();
        backend
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE app SET bookmarks = 'N4IgLgpgTg' WHERE id = 1",
                    [],
                )
                .map(|_| ())
                .map_err(|e| StorageError::from_sql(NativeErrorKind::QueryFailed, e))
            })
            .await
            .unwrap();

        let values = backend
            .get_structured(&[StoreKey::Bookmarks, StoreKey::RemovedSync])
            .await
            .unwrap();
        assert_eq!(values, vec![Some(StoreContent::from("N4IgLgpgTg")), None]);
    }

    #[tokio::test]
    async fn test_open_failure_is_wrapped() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        // Parent of the database path is a regular file
        let backend = StructuredBackend::open_file(blocker.join("xbs.db"));

        let err = backend.get_log().await.unwrap_err();
        assert_eq!(err.kind, NativeErrorKind::OpenFailed);
        assert!(!backend.is_open());
    }
}
