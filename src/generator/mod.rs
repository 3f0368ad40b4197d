//! Concept generator — the external text-generation capability.
//!
//! Defines the generator trait and error type. Two implementations:
//! - `GroqGenerator`: calls the Groq chat-completions API (production)
//! - `MockGenerator`: returns preconfigured responses (testing)
//!
//! The generator is purely generative: it never touches storage, so the
//! orchestration logic and its tests are independent of which backend
//! produces the text.

mod groq;

pub use groq::GroqGenerator;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Errors from concept generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed generation output: {0}")]
    Malformed(String),
}

/// Trait for generating concept text.
///
/// Abstracts over the generative backend so the orchestrator doesn't
/// depend on how the text is produced.
#[async_trait]
pub trait ConceptGenerator: Send + Sync {
    /// Generate two short, thematically distinct creative phrases.
    ///
    /// Both are non-empty and non-identical; anything else from the
    /// backend is a `Malformed` error.
    async fn generate_pair(&self) -> Result<(String, String), GeneratorError>;

    /// Generate one new short phrase informed by both inputs.
    async fn combine(&self, concept_a: &str, concept_b: &str) -> Result<String, GeneratorError>;
}

/// Mock generator for testing — returns preconfigured responses.
pub struct MockGenerator {
    pair: (String, String),
    combined: String,
    /// Number of calls (across both operations) that fail before succeeding
    failures: AtomicUsize,
}

impl MockGenerator {
    /// Create a mock generator with default responses.
    pub fn new() -> Self {
        Self {
            pair: (
                "midnight garden".to_string(),
                "clockwork tide".to_string(),
            ),
            combined: "garden of ticking waves".to_string(),
            failures: AtomicUsize::new(0),
        }
    }

    /// Set the pair returned by `generate_pair`.
    pub fn with_pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.pair = (a.into(), b.into());
        self
    }

    /// Set the text returned by `combine`.
    pub fn with_combined(mut self, text: impl Into<String>) -> Self {
        self.combined = text.into();
        self
    }

    /// Make the next `n` generator calls fail before responses succeed.
    pub fn fail_times(self, n: usize) -> Self {
        self.failures.store(n, Ordering::SeqCst);
        self
    }

    /// Consume one pending failure, if any remain.
    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConceptGenerator for MockGenerator {
    async fn generate_pair(&self) -> Result<(String, String), GeneratorError> {
        if self.take_failure() {
            return Err(GeneratorError::Api {
                status: 503,
                message: "mock failure".to_string(),
            });
        }
        Ok(self.pair.clone())
    }

    async fn combine(&self, _concept_a: &str, _concept_b: &str) -> Result<String, GeneratorError> {
        if self.take_failure() {
            return Err(GeneratorError::Api {
                status: 503,
                message: "mock failure".to_string(),
            });
        }
        Ok(self.combined.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_configured_responses() {
        let generator = MockGenerator::new()
            .with_pair("sea of glass", "a forgotten key")
            .with_combined("tide-locked door");

        let (a, b) = generator.generate_pair().await.unwrap();
        assert_eq!(a, "sea of glass");
        assert_eq!(b, "a forgotten key");

        let combined = generator.combine(&a, &b).await.unwrap();
        assert_eq!(combined, "tide-locked door");
    }

    #[tokio::test]
    async fn mock_fails_then_recovers() {
        let generator = MockGenerator::new().fail_times(2);

        assert!(generator.generate_pair().await.is_err());
        assert!(generator.combine("a", "b").await.is_err());
        assert!(generator.generate_pair().await.is_ok());
    }
}
