//! Core dream data structures and orchestration

mod model;
mod orchestrator;

pub use model::{derive_label, Concept, ConceptId, Dream, DreamId};
pub use orchestrator::{DreamError, DreamOrchestrator, DreamPage, DreamResult, DreamSummary};
