//! In-memory knowledge graph store
//!
//! Owns the node set (keyed by id, insertion order preserved) and the
//! edge set (insertion order preserved). The store guarantees structural
//! consistency only: no duplicate ids, no dangling edge endpoints.
//! Multi-edge dedup and edge direction are producer responsibilities.

use crate::error::GraphError;
use crate::types::{ConceptLevel, ConceptNode, Edge};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Snapshot summary of a graph, used for progress reporting
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GraphStats {
    /// Total number of concepts
    pub num_concepts: usize,
    /// Total number of edges
    pub num_edges: usize,
    /// Concept counts keyed by level name
    pub by_level: BTreeMap<ConceptLevel, usize>,
}

/// Directed graph of concepts and typed relationships
///
/// Single-writer by construction: one pipeline owns the graph at a time
/// and ownership transfers serially between pipelines.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: IndexMap<String, ConceptNode>,
    edges: Vec<Edge>,
}

impl KnowledgeGraph {
    /// Create an empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a concept
    ///
    /// Ids are immutable once added: re-adding an existing id is a
    /// no-op that leaves the stored node untouched. Returns whether the
    /// node was inserted.
    pub fn add_concept(&mut self, node: ConceptNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            tracing::debug!("Ignoring duplicate concept id: {}", node.id);
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Insert an edge
    ///
    /// Both endpoints must already be in the graph; an edge referencing
    /// an unknown id is rejected so the edge set never dangles. The
    /// store does not deduplicate multi-edges.
    ///
    /// # Errors
    /// - `GraphError::MissingEndpoint` if either endpoint is unknown
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
            return Err(GraphError::MissingEndpoint {
                source_id: edge.source,
                target: edge.target,
            });
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Look up a concept by id
    #[inline]
    #[must_use]
    pub fn get_concept(&self, id: &str) -> Option<&ConceptNode> {
        self.nodes.get(id)
    }

    /// All concepts, in insertion order
    pub fn concepts(&self) -> impl Iterator<Item = &ConceptNode> {
        self.nodes.values()
    }

    /// All edges, in insertion order
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of concepts in the graph
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no concepts
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the graph contains the given concept id
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Ids of the concepts the given concept depends on
    ///
    /// Reads edges whose relationship points dependent -> dependency
    /// (`requires`, `builds_on`, `variant_of`, `evolves_to`), in edge
    /// insertion order. Correct only if producers honored the direction
    /// contract.
    #[must_use]
    pub fn prerequisites(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == id && e.relationship.is_prerequisite())
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Total ordering of all concept ids consistent with prerequisite
    /// edges where one exists
    ///
    /// Edges are LLM-authored and may contain cycles; the sort never
    /// panics or hangs. Placement policy: repeated sweeps in insertion
    /// order placing every node whose prerequisites are all placed;
    /// when a sweep makes no progress (cycle), the unplaced node with
    /// the lowest (level, insertion index) is placed to break the tie.
    #[must_use]
    pub fn topological_sort(&self) -> Vec<String> {
        let mut placed: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        let mut order: Vec<String> = Vec::with_capacity(self.nodes.len());

        // Prerequisites known to the graph; endpoints are always valid.
        let prereqs_of = |id: &str| -> Vec<&str> { self.prerequisites(id) };

        while order.len() < self.nodes.len() {
            let mut progressed = false;
            for id in self.nodes.keys() {
                if placed.contains(id.as_str()) {
                    continue;
                }
                if prereqs_of(id).iter().all(|p| placed.contains(p)) {
                    placed.insert(id.as_str());
                    order.push(id.clone());
                    progressed = true;
                }
            }
            if !progressed {
                // Cycle: deterministic tie-break by level, then insertion order.
                let pick = self
                    .nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, (id, _))| !placed.contains(id.as_str()))
                    .min_by_key(|(idx, (_, node))| (node.level, *idx))
                    .map(|(_, (id, _))| id);
                if let Some(id) = pick {
                    tracing::warn!("Cycle detected in graph, force-placing concept: {id}");
                    placed.insert(id.as_str());
                    order.push(id.clone());
                } else {
                    break;
                }
            }
        }

        order
    }

    /// Summary counts by level plus totals
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let mut by_level: BTreeMap<ConceptLevel, usize> = BTreeMap::new();
        for node in self.nodes.values() {
            *by_level.entry(node.level).or_insert(0) += 1;
        }
        GraphStats {
            num_concepts: self.nodes.len(),
            num_edges: self.edges.len(),
            by_level,
        }
    }

    /// Serialize to the `{nodes, edges}` interchange document
    ///
    /// This is the sole format shared with every other pipeline stage;
    /// round-trip fidelity is a hard compatibility requirement.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "nodes": self.nodes.values().collect::<Vec<_>>(),
            "edges": self.edges,
        })
    }

    /// Rebuild a graph from the `{nodes, edges}` interchange document
    ///
    /// Input is LLM-authored at some point of its life, so partial
    /// validity is tolerated: an entity that fails to decode, a
    /// duplicate id, or a dangling edge is skipped with a warning and
    /// never aborts the batch.
    #[must_use]
    pub fn from_json(doc: &Value) -> Self {
        let mut kg = Self::new();

        if let Some(nodes) = doc.get("nodes").and_then(Value::as_array) {
            for raw in nodes {
                match serde_json::from_value::<ConceptNode>(raw.clone()) {
                    Ok(node) => {
                        if !kg.add_concept(node) {
                            tracing::warn!("Skipping duplicate node in document");
                        }
                    }
                    Err(e) => {
                        let id = raw.get("id").and_then(Value::as_str).unwrap_or("?");
                        tracing::warn!("Skipping invalid node {id}: {e}");
                    }
                }
            }
        }

        if let Some(edges) = doc.get("edges").and_then(Value::as_array) {
            for raw in edges {
                match serde_json::from_value::<Edge>(raw.clone()) {
                    Ok(edge) => {
                        if let Err(e) = kg.add_edge(edge) {
                            tracing::warn!("Skipping edge: {e}");
                        }
                    }
                    Err(e) => tracing::warn!("Skipping invalid edge: {e}"),
                }
            }
        }

        kg
    }

    /// Write a pretty-printed JSON snapshot to disk
    ///
    /// # Errors
    /// - `GraphError::Io` on filesystem failure
    pub fn save(&self, path: &Path) -> Result<(), GraphError> {
        let text = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(path, text)?;
        tracing::info!("Graph saved to {}", path.display());
        Ok(())
    }

    /// Load a graph from a JSON snapshot on disk
    ///
    /// # Errors
    /// - `GraphError::Io` if the file cannot be read
    /// - `GraphError::Serialization` if the file is not JSON
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let text = std::fs::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&text)?;
        Ok(Self::from_json(&doc))
    }
}
