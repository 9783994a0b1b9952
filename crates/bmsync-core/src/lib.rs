//! bmsync core library
//!
//! Local persistence and optimistic bookmark editing for the bmsync
//! bookmark sync client.
//!
//! # Architecture
//!
//! - **Native storage**: flat key/value store for simple settings
//! - **SQLite**: single-row app table for structured documents, plus an
//!   append-only trace log table
//!
//! Callers never pick a backend. Every key belongs to exactly one of them
//! and the routed store dispatches accordingly.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = RoutedStore::open(&config)?;
//!
//! store.write(StoreKey::TelemetryEnabled, Some(true.into())).await?;
//! let values = store.read(&[StoreKey::TelemetryEnabled, StoreKey::Bookmarks]).await?;
//! ```
//!
//! # Modules
//!
//! - `store`: Routed key/value store over native storage and SQLite
//! - `mutation`: Optimistic bookmark deletion with undo
//! - `trace_log`: Persisted diagnostic log
//! - `config`: Application configuration

pub mod config;
pub mod mutation;
pub mod store;
pub mod trace_log;

pub use config::Config;
pub use mutation::{Bookmark, MutationController, MutationOutcome};
pub use store::{RoutedStore, StorageError, StorageResult, StoreContent, StoreKey};
pub use trace_log::TraceLogger;
