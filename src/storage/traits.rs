//! Storage trait definitions

use crate::dream::{Concept, Dream, DreamId};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Id parsing error: {0}")]
    IdParse(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for dream/concept storage backends
///
/// Implementations must be thread-safe (Send + Sync) to support
/// concurrent access from multiple request handlers.
pub trait DreamStore: Send + Sync {
    // === Dream Operations ===

    /// Insert a dream and its seed concepts in a single transaction.
    ///
    /// The concepts must all belong to the dream. Either every row is
    /// written or none are, so a failed start never leaves a dream with
    /// no concepts attached.
    fn create_dream(&self, dream: &Dream, concepts: &[Concept]) -> StorageResult<()>;

    /// Load a dream by id
    fn get_dream(&self, id: &DreamId) -> StorageResult<Option<Dream>>;

    /// List dreams ordered by creation time, newest first
    fn list_dreams(&self, offset: u64, limit: u64) -> StorageResult<Vec<Dream>>;

    /// Total number of dreams
    fn count_dreams(&self) -> StorageResult<u64>;

    /// Delete a dream; owned concepts are removed by cascade
    fn delete_dream(&self, id: &DreamId) -> StorageResult<bool>;

    // === Concept Operations ===

    /// Insert a single concept
    fn insert_concept(&self, concept: &Concept) -> StorageResult<()>;

    /// All concepts of a dream ordered by creation time, newest first
    fn concepts_for_dream(&self, dream_id: &DreamId) -> StorageResult<Vec<Concept>>;

    /// The dream's initial concepts (no parents) in creation order, at most two
    fn initial_concepts(&self, dream_id: &DreamId) -> StorageResult<Vec<Concept>>;

    /// Sample up to `count` concepts uniformly at random, without replacement
    fn sample_concepts(&self, dream_id: &DreamId, count: u64) -> StorageResult<Vec<Concept>>;

    // === Health ===

    /// Trivial connectivity probe
    fn ping(&self) -> StorageResult<()>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: DreamStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
