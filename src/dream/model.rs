//! Dream and Concept representations

use chrono::{DateTime, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current time truncated to microseconds, the precision the storage layer
/// keeps. Constructing at stored precision keeps timestamp comparisons
/// consistent before and after a database round trip.
fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(chrono::Duration::microseconds(1))
        .unwrap_or(now)
}

/// Unique identifier for a dream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DreamId(Uuid);

impl DreamId {
    /// Create a new random DreamId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a DreamId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a DreamId from its string form
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for DreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConceptId(Uuid);

impl ConceptId {
    /// Create a new random ConceptId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a ConceptId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a ConceptId from its string form
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ConceptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dream session grouping a set of related concepts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dream {
    /// Unique identifier
    pub id: DreamId,
    /// When the dream was created
    pub created_at: DateTime<Utc>,
}

impl Dream {
    /// Create a new dream with a fresh id and the current timestamp
    pub fn new() -> Self {
        Self {
            id: DreamId::new(),
            created_at: now_micros(),
        }
    }
}

impl Default for Dream {
    fn default() -> Self {
        Self::new()
    }
}

/// A short text snippet within a dream.
///
/// Concepts form a DAG through their parent links: an "initial" concept has
/// both parents absent, a "derived" concept has both set. Parents always
/// predate their children, so no cycles are possible. Concepts are immutable
/// once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Unique identifier
    pub id: ConceptId,
    /// Text content (non-empty by convention)
    pub content: String,
    /// First parent, set together with `parent2_id` for derived concepts
    pub parent1_id: Option<ConceptId>,
    /// Second parent, set together with `parent1_id` for derived concepts
    pub parent2_id: Option<ConceptId>,
    /// The dream this concept belongs to (never changes after creation)
    pub dream_id: DreamId,
    /// When the concept was created
    pub created_at: DateTime<Utc>,
}

impl Concept {
    /// Create an initial concept (no parents), seeded at dream creation
    pub fn initial(dream_id: DreamId, content: impl Into<String>) -> Self {
        Self {
            id: ConceptId::new(),
            content: content.into(),
            parent1_id: None,
            parent2_id: None,
            dream_id,
            created_at: now_micros(),
        }
    }

    /// Create a derived concept combining two existing concepts
    pub fn derived(
        dream_id: DreamId,
        content: impl Into<String>,
        parent1_id: ConceptId,
        parent2_id: ConceptId,
    ) -> Self {
        Self {
            id: ConceptId::new(),
            content: content.into(),
            parent1_id: Some(parent1_id),
            parent2_id: Some(parent2_id),
            dream_id,
            created_at: now_micros(),
        }
    }

    /// True if this concept was seeded without parents
    pub fn is_initial(&self) -> bool {
        self.parent1_id.is_none() && self.parent2_id.is_none()
    }
}

/// Placeholder token for a blank initial concept
const UNKNOWN_TOKEN: &str = "Unknown";

/// Placeholder label for a dream with no initial concepts
const UNLABELED: &str = "Unlabeled";

/// Derive a display label from a dream's initial concepts.
///
/// Takes the first whitespace-delimited token of each concept's content
/// ("Unknown" when the content is blank) and joins the tokens with a single
/// space. A dream with no initial concepts gets "Unlabeled". Callers pass
/// the initial concepts in creation order.
pub fn derive_label(initial_concepts: &[Concept]) -> String {
    if initial_concepts.is_empty() {
        return UNLABELED.to_string();
    }

    initial_concepts
        .iter()
        .map(|concept| {
            concept
                .content
                .split_whitespace()
                .next()
                .unwrap_or(UNKNOWN_TOKEN)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
