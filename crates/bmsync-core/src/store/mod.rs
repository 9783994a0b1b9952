//! Storage layer
//!
//! App state lives in two places:
//!
//! - **Native storage**: the primitive key/value plugin, for small scalar
//!   preferences
//! - **SQLite**: a single-row `app` table for structured documents and an
//!   ordered `traceLog` table for the diagnostic log
//!
//! `RoutedStore` hides the split behind one key/value contract. `StoreKey`
//! decides which backend serves each key.

pub mod content;
pub mod error;
pub mod key;
pub mod native;
pub mod primitive;
pub mod routed;
pub mod schema;
pub mod structured;

pub use content::{LogOp, StoreContent, TraceLogItem, TraceLogLevel};
pub use error::{NativeError, NativeErrorKind, StorageError, StorageResult};
pub use key::{Backend, StoreKey};
pub use native::{FileNativeStorage, MemoryNativeStorage, NativeStorage};
pub use routed::RoutedStore;
pub use schema::{adopt_schema, init_schema, needs_init, needs_upgrade, SCHEMA_VERSION};
pub use structured::{DatabaseLocation, StructuredBackend};
