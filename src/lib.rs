//! Daydream: a backend for growing trees of creative concepts.
//!
//! A dream is a session that starts from two seed concepts and grows one
//! derived concept per round by sampling two existing concepts and asking an
//! LLM to combine them. Parent links give every derived concept its
//! provenance, forming a DAG per dream.
//!
//! # Core Concepts
//!
//! - **Dream**: a session/container grouping related concepts
//! - **Concept**: a short text snippet, optionally derived from two parents
//! - **Generator**: the external text-generation capability (Groq in
//!   production, a mock in tests)

pub mod dream;
pub mod generator;
pub mod http;
pub mod storage;

pub use dream::{
    derive_label, Concept, ConceptId, Dream, DreamError, DreamId, DreamOrchestrator, DreamPage,
    DreamResult, DreamSummary,
};
pub use generator::{ConceptGenerator, GeneratorError, GroqGenerator, MockGenerator};
pub use storage::{DreamStore, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
