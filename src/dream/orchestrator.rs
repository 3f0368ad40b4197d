//! DreamOrchestrator: the coordination point between the generator and storage.
//!
//! Owns the lifecycle of a dream: seeding the two initial concepts, growing
//! the tree one derived concept per round, and the read paths the HTTP
//! surface exposes. The generator client and the store are constructed once
//! at process start and passed in, never rebuilt per call.

use super::model::{derive_label, Concept, Dream, DreamId};
use crate::generator::{ConceptGenerator, GeneratorError};
use crate::storage::{DreamStore, StorageError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// How many concepts a round samples and combines
const SAMPLE_COUNT: u64 = 2;

/// Generator call budget per orchestrator operation
const GENERATION_ATTEMPTS: u32 = 3;

/// Base delay between generator retries (grows linearly per attempt)
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Errors that can occur in orchestrator operations
#[derive(Debug, Error)]
pub enum DreamError {
    #[error("Dream not found: {0}")]
    DreamNotFound(DreamId),

    #[error("Dream {dream_id} has only {available} concepts, but {requested} were requested")]
    InsufficientConcepts {
        dream_id: DreamId,
        available: usize,
        requested: usize,
    },

    #[error("Generation error: {0}")]
    Generation(#[from] GeneratorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for orchestrator operations
pub type DreamResult<T> = Result<T, DreamError>;

/// A dream annotated with its display label, for listings
#[derive(Debug, Clone, Serialize)]
pub struct DreamSummary {
    pub id: DreamId,
    pub created_at: DateTime<Utc>,
    pub label: String,
}

/// One page of the dream listing
#[derive(Debug, Clone, Serialize)]
pub struct DreamPage {
    pub dreams: Vec<DreamSummary>,
    pub has_more: bool,
    pub total_count: u64,
}

/// Coordinates dream growth across the generator and the store.
pub struct DreamOrchestrator {
    generator: Arc<dyn ConceptGenerator>,
    store: Arc<dyn DreamStore>,
}

impl DreamOrchestrator {
    /// Create a new orchestrator over the given generator and store.
    pub fn new(generator: Arc<dyn ConceptGenerator>, store: Arc<dyn DreamStore>) -> Self {
        Self { generator, store }
    }

    /// Generate two initial concepts without touching storage.
    ///
    /// The caller may edit the texts before starting a dream with them.
    pub async fn preview_new_dream(&self) -> DreamResult<(String, String)> {
        info!("generating initial concept pair");
        let pair = self.generate_pair_with_retry().await?;
        info!("generated initial concepts: '{}' and '{}'", pair.0, pair.1);
        Ok(pair)
    }

    /// Start a dream from two seed texts.
    ///
    /// Combines the seeds first (no storage lock held during the generator
    /// call), then writes the dream, both initial concepts, and the derived
    /// concept in a single transaction.
    pub async fn start_dream(
        &self,
        concept_a: impl Into<String>,
        concept_b: impl Into<String>,
    ) -> DreamResult<DreamId> {
        let concept_a = concept_a.into();
        let concept_b = concept_b.into();

        info!("starting dream from '{concept_a}' and '{concept_b}'");
        let combined = self.combine_with_retry(&concept_a, &concept_b).await?;

        let dream = Dream::new();
        let first = Concept::initial(dream.id, concept_a);
        let mut second = Concept::initial(dream.id, concept_b);
        // Back-to-back constructions can land in the same microsecond;
        // creation order must stay strict for labels and newest-first reads
        if second.created_at <= first.created_at {
            second.created_at = first.created_at + chrono::Duration::microseconds(1);
        }
        let mut child = Concept::derived(dream.id, combined, first.id, second.id);
        if child.created_at <= second.created_at {
            child.created_at = second.created_at + chrono::Duration::microseconds(1);
        }

        let dream_id = dream.id;
        self.store
            .create_dream(&dream, &[first, second, child])?;

        info!("started dream {dream_id} with 3 concepts");
        Ok(dream_id)
    }

    /// Grow a dream by one round: sample two concepts, combine them, and
    /// record the result with both samples as parents.
    pub async fn continue_dream(&self, dream_id: DreamId) -> DreamResult<()> {
        self.store
            .get_dream(&dream_id)?
            .ok_or(DreamError::DreamNotFound(dream_id))?;

        let sampled = self.store.sample_concepts(&dream_id, SAMPLE_COUNT)?;
        if sampled.len() < SAMPLE_COUNT as usize {
            return Err(DreamError::InsufficientConcepts {
                dream_id,
                available: sampled.len(),
                requested: SAMPLE_COUNT as usize,
            });
        }

        info!(
            "continuing dream {dream_id}: combining '{}' and '{}'",
            sampled[0].content, sampled[1].content
        );
        let combined = self
            .combine_with_retry(&sampled[0].content, &sampled[1].content)
            .await?;

        let child = Concept::derived(dream_id, combined, sampled[0].id, sampled[1].id);
        self.store.insert_concept(&child)?;

        info!("added derived concept {} to dream {dream_id}", child.id);
        Ok(())
    }

    /// Load a dream and all its concepts, newest first.
    pub fn get_dream(&self, dream_id: DreamId) -> DreamResult<(Dream, Vec<Concept>)> {
        let dream = self
            .store
            .get_dream(&dream_id)?
            .ok_or(DreamError::DreamNotFound(dream_id))?;
        let concepts = self.store.concepts_for_dream(&dream_id)?;
        Ok((dream, concepts))
    }

    /// List dreams newest first, each labeled from its initial concepts.
    pub fn list_dreams(&self, offset: u64, limit: u64) -> DreamResult<DreamPage> {
        let total_count = self.store.count_dreams()?;
        let dreams = self.store.list_dreams(offset, limit)?;

        let mut summaries = Vec::with_capacity(dreams.len());
        for dream in dreams {
            let initial = self.store.initial_concepts(&dream.id)?;
            summaries.push(DreamSummary {
                id: dream.id,
                created_at: dream.created_at,
                label: derive_label(&initial),
            });
        }

        Ok(DreamPage {
            dreams: summaries,
            has_more: offset.saturating_add(limit) < total_count,
            total_count,
        })
    }

    /// Probe storage connectivity.
    pub fn check_storage(&self) -> bool {
        self.store.ping().is_ok()
    }

    async fn generate_pair_with_retry(&self) -> Result<(String, String), GeneratorError> {
        let mut attempt = 0;
        loop {
            match self.generator.generate_pair().await {
                Ok(pair) => return Ok(pair),
                Err(err) => {
                    attempt += 1;
                    if attempt >= GENERATION_ATTEMPTS {
                        return Err(err);
                    }
                    warn!("concept pair generation attempt {attempt} failed: {err}; retrying");
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                }
            }
        }
    }

    async fn combine_with_retry(
        &self,
        concept_a: &str,
        concept_b: &str,
    ) -> Result<String, GeneratorError> {
        let mut attempt = 0;
        loop {
            match self.generator.combine(concept_a, concept_b).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    attempt += 1;
                    if attempt >= GENERATION_ATTEMPTS {
                        return Err(err);
                    }
                    warn!("concept combination attempt {attempt} failed: {err}; retrying");
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                }
            }
        }
    }
}
