//! Concept node and edge types
//!
//! The fixed enumerations here are injected verbatim into prompt text by
//! the pipelines, so their serialized names are part of the backend
//! contract and must stay stable.

use serde::{Deserialize, Serialize};

/// Category of a concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptType {
    Architecture,
    Technique,
    Component,
    Optimization,
    Training,
    Tokenization,
    Theory,
    Application,
}

impl ConceptType {
    /// All categories, in prompt listing order
    pub const ALL: [Self; 8] = [
        Self::Architecture,
        Self::Technique,
        Self::Component,
        Self::Optimization,
        Self::Training,
        Self::Tokenization,
        Self::Theory,
        Self::Application,
    ];

    /// Serialized name of this category
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Technique => "technique",
            Self::Component => "component",
            Self::Optimization => "optimization",
            Self::Training => "training",
            Self::Tokenization => "tokenization",
            Self::Theory => "theory",
            Self::Application => "application",
        }
    }
}

impl std::fmt::Display for ConceptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pedagogical depth of a concept
///
/// Ordered from foundational to frontier; the ordering is used as a
/// tie-break when topological sorting hits a cycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConceptLevel {
    Foundational,
    Intermediate,
    Advanced,
    Frontier,
}

impl ConceptLevel {
    /// All levels, foundational first
    pub const ALL: [Self; 4] = [
        Self::Foundational,
        Self::Intermediate,
        Self::Advanced,
        Self::Frontier,
    ];

    /// Serialized name of this level
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foundational => "foundational",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Frontier => "frontier",
        }
    }
}

impl std::fmt::Display for ConceptLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed relationship between two concepts
///
/// Every relationship has a fixed semantic direction which producers
/// must respect (e.g. `component_of` points child -> parent,
/// `requires` points dependent -> dependency). The store does not infer
/// or correct direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    BuildsOn,
    Optimizes,
    Requires,
    EvolvesTo,
    VariantOf,
    ComponentOf,
    AlternativeTo,
    Enables,
}

impl RelationshipType {
    /// All relationship types, in prompt listing order
    pub const ALL: [Self; 8] = [
        Self::BuildsOn,
        Self::Optimizes,
        Self::Requires,
        Self::EvolvesTo,
        Self::VariantOf,
        Self::ComponentOf,
        Self::AlternativeTo,
        Self::Enables,
    ];

    /// Serialized name of this relationship
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildsOn => "builds_on",
            Self::Optimizes => "optimizes",
            Self::Requires => "requires",
            Self::EvolvesTo => "evolves_to",
            Self::VariantOf => "variant_of",
            Self::ComponentOf => "component_of",
            Self::AlternativeTo => "alternative_to",
            Self::Enables => "enables",
        }
    }

    /// Whether an edge of this type reads dependent -> dependency,
    /// making the target a prerequisite of the source.
    #[inline]
    #[must_use]
    pub fn is_prerequisite(&self) -> bool {
        matches!(
            self,
            Self::Requires | Self::BuildsOn | Self::VariantOf | Self::EvolvesTo
        )
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// A single concept in the knowledge graph
///
/// The `id` is the sole join key: dedup, edge endpoints and cross-pass
/// merging all go through it. Ids are immutable once added to a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    /// Stable snake_case identifier, unique within a graph
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Concept category
    #[serde(rename = "type")]
    pub kind: ConceptType,
    /// Pedagogical level
    pub level: ConceptLevel,
    /// 1-2 sentence description
    #[serde(default)]
    pub description: String,
    /// Key ideas, in order
    #[serde(default)]
    pub key_ideas: Vec<String>,
    /// file:symbol pointers into the analyzed repository
    #[serde(default)]
    pub code_refs: Vec<String>,
    /// Seminal paper reference, empty if none exists
    #[serde(default)]
    pub paper_ref: String,
    /// Date the concept first appeared in the repository, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_appeared: Option<String>,
    /// 1.0 = asserted from source analysis, < 1.0 = inferred by expansion
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl ConceptNode {
    /// Create a new concept with empty detail fields and confidence 1.0
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ConceptType,
        level: ConceptLevel,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            level,
            description: String::new(),
            key_ideas: Vec::new(),
            code_refs: Vec::new(),
            paper_ref: String::new(),
            first_appeared: None,
            confidence: 1.0,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With confidence score (clamped to 0.0-1.0)
    #[inline]
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// A directed, typed relationship between two concept ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source concept id
    pub source: String,
    /// Target concept id
    pub target: String,
    /// Relationship type, read in its fixed semantic direction
    pub relationship: RelationshipType,
    /// Free-text description of the relationship
    #[serde(default)]
    pub description: String,
}

impl Edge {
    /// Create a new edge with an empty description
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: RelationshipType,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship,
            description: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_type_serializes_lowercase() {
        let json = serde_json::to_string(&ConceptType::Architecture).unwrap();
        assert_eq!(json, "\"architecture\"");
    }

    #[test]
    fn relationship_serializes_snake_case() {
        let json = serde_json::to_string(&RelationshipType::BuildsOn).unwrap();
        assert_eq!(json, "\"builds_on\"");
        let back: RelationshipType = serde_json::from_str("\"component_of\"").unwrap();
        assert_eq!(back, RelationshipType::ComponentOf);
    }

    #[test]
    fn level_ordering_foundational_first() {
        assert!(ConceptLevel::Foundational < ConceptLevel::Intermediate);
        assert!(ConceptLevel::Advanced < ConceptLevel::Frontier);
    }

    #[test]
    fn prerequisite_relationships() {
        assert!(RelationshipType::Requires.is_prerequisite());
        assert!(RelationshipType::BuildsOn.is_prerequisite());
        assert!(RelationshipType::VariantOf.is_prerequisite());
        assert!(RelationshipType::EvolvesTo.is_prerequisite());
        assert!(!RelationshipType::ComponentOf.is_prerequisite());
        assert!(!RelationshipType::Optimizes.is_prerequisite());
    }

    #[test]
    fn all_listings_match_as_str() {
        assert_eq!(ConceptType::ALL.len(), 8);
        assert_eq!(RelationshipType::ALL.len(), 8);
        let listed: Vec<&str> = ConceptLevel::ALL.iter().map(|l| l.as_str()).collect();
        assert_eq!(
            listed,
            vec!["foundational", "intermediate", "advanced", "frontier"]
        );
    }

    #[test]
    fn node_defaults_on_decode() {
        let node: ConceptNode = serde_json::from_str(
            r#"{"id": "a", "name": "A", "type": "theory", "level": "intermediate"}"#,
        )
        .unwrap();
        assert_eq!(node.confidence, 1.0);
        assert!(node.key_ideas.is_empty());
        assert!(node.first_appeared.is_none());
    }

    #[test]
    fn node_first_appeared_omitted_when_absent() {
        let node = ConceptNode::new("a", "A", ConceptType::Theory, ConceptLevel::Advanced);
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("first_appeared").is_none());
    }

    #[test]
    fn confidence_clamped() {
        let node = ConceptNode::new("a", "A", ConceptType::Theory, ConceptLevel::Advanced)
            .with_confidence(1.7);
        assert_eq!(node.confidence, 1.0);
    }
}
