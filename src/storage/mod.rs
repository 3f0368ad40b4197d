//! Storage layer: trait definitions and the SQLite backend

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{DreamStore, OpenStore, StorageError, StorageResult};
