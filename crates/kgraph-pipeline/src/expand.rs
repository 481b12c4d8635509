//! Graph expansion pipeline
//!
//! Iteratively grows an existing graph with inferred frontier concepts.
//! Each round shows the model a budgeted summary of the current graph
//! and asks for a fixed number of new concepts; expansion halts early
//! when a round contributes no new nodes.
//!
//! Expanded nodes are speculative, so their confidence is capped below
//! 1.0 to keep inferred provenance distinguishable from extraction.

use crate::decode::{decode_edge, decode_node, NodeDefaults};
use crate::error::PipelineError;
use crate::prompts;
use kgraph_core::{ConceptLevel, ConceptType, KnowledgeGraph};
use kgraph_llm::{parse_json_response, ChatBackend, ChatRequest};
use serde_json::Value;

const SUMMARY_DESCRIPTION_CHARS: usize = 100;
const INFERRED_CONFIDENCE_CAP: f64 = 0.99;

/// Tuning knobs for the expansion pipeline
#[derive(Debug, Clone, Copy)]
pub struct ExpanderConfig {
    /// Number of expansion rounds to attempt
    pub rounds: usize,
    /// New concepts requested per round
    pub concepts_per_round: usize,
    /// Character budget for the existing-concept listing
    pub concept_budget: usize,
    /// Completion budget per round
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            rounds: 2,
            concepts_per_round: 10,
            concept_budget: 6000,
            max_tokens: 4096,
            temperature: 0.3,
        }
    }
}

/// Expansion defaults: unlabeled inferred nodes are assumed frontier.
const EXPAND_DEFAULTS: NodeDefaults = NodeDefaults {
    kind: ConceptType::Architecture,
    level: ConceptLevel::Frontier,
    confidence: 0.8,
};

/// What an expansion run contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    /// Rounds actually executed (early halt counts the halting round)
    pub rounds_run: usize,
    /// Nodes added across all rounds
    pub nodes_added: usize,
    /// Edges added across all rounds
    pub edges_added: usize,
}

/// Grows a knowledge graph with LLM-inferred concepts
pub struct GraphExpander<B> {
    backend: B,
    config: ExpanderConfig,
}

impl<B: ChatBackend> GraphExpander<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: ExpanderConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExpanderConfig) -> Self {
        self.config = config;
        self
    }

    /// Run up to `config.rounds` expansion rounds against the graph
    ///
    /// # Errors
    /// - `PipelineError::Backend` if a backend call fails mid-run; the
    ///   graph keeps whatever earlier rounds already added
    pub async fn expand(&self, graph: &mut KnowledgeGraph) -> Result<ExpansionReport, PipelineError> {
        let system = prompts::expansion_system_prompt();
        let mut report = ExpansionReport::default();

        for round in 1..=self.config.rounds {
            tracing::info!(
                "Expansion round {round}/{} ({} concepts in graph)",
                self.config.rounds,
                graph.len()
            );
            report.rounds_run = round;

            let (added_nodes, added_edges) = self.run_round(&system, graph).await?;
            report.nodes_added += added_nodes;
            report.edges_added += added_edges;

            if added_nodes == 0 {
                tracing::info!("Round {round} added no new concepts, stopping expansion");
                break;
            }
            tracing::info!("Round {round} added {added_nodes} concepts, {added_edges} edges");
        }

        Ok(report)
    }

    async fn run_round(
        &self,
        system: &str,
        graph: &mut KnowledgeGraph,
    ) -> Result<(usize, usize), PipelineError> {
        let listing = self.summarize_graph(graph);
        let user = prompts::expansion_user_prompt(graph.len(), &listing, self.config.concepts_per_round);

        let request = ChatRequest::new(system.to_string(), user)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        let response = self.backend.chat(request).await?;
        if response.finish.is_truncated() {
            tracing::warn!("Expansion response truncated, salvaging what parsed");
        }
        let doc = parse_json_response(&response.text);

        let mut added_nodes = 0;
        for raw in doc.get("new_nodes").and_then(Value::as_array).into_iter().flatten() {
            let Some(mut node) = decode_node(raw, EXPAND_DEFAULTS) else {
                continue;
            };
            if graph.contains(&node.id) {
                tracing::debug!("Expansion re-proposed existing concept {}, skipping", node.id);
                continue;
            }
            node.confidence = node.confidence.min(INFERRED_CONFIDENCE_CAP);
            graph.add_concept(node);
            added_nodes += 1;
        }

        let mut added_edges = 0;
        for raw in doc.get("new_edges").and_then(Value::as_array).into_iter().flatten() {
            let Some(edge) = decode_edge(raw) else { continue };
            match graph.add_edge(edge) {
                Ok(()) => added_edges += 1,
                Err(err) => tracing::warn!("Skipping expansion edge: {err}"),
            }
        }

        Ok((added_nodes, added_edges))
    }
}

impl<B> GraphExpander<B> {
    /// Budgeted one-line-per-concept listing, with an omission marker
    /// when the budget cuts the graph short.
    fn summarize_graph(&self, graph: &KnowledgeGraph) -> String {
        let mut text = String::new();
        let mut shown = 0;
        for node in graph.concepts() {
            let description: String = node
                .description
                .chars()
                .take(SUMMARY_DESCRIPTION_CHARS)
                .collect();
            let line = format!(
                "- {}: {} ({}, {}) — {}",
                node.id, node.name, node.kind, node.level, description
            );
            if !text.is_empty()
                && text.chars().count() + line.chars().count() + 1 > self.config.concept_budget
            {
                break;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&line);
            shown += 1;
        }
        let omitted = graph.len().saturating_sub(shown);
        if omitted > 0 {
            text.push_str(&format!(
                "\n... and {omitted} more concepts (omitted for brevity)"
            ));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgraph_core::ConceptNode;

    fn seeded_graph(count: usize) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for i in 0..count {
            graph.add_concept(
                ConceptNode::new(
                    format!("concept_{i}"),
                    format!("Concept {i}"),
                    ConceptType::Theory,
                    ConceptLevel::Foundational,
                )
                .with_description("A concept used to exercise the summary listing."),
            );
        }
        graph
    }

    #[test]
    fn summary_lists_all_when_under_budget() {
        let graph = seeded_graph(3);
        let expander = GraphExpander {
            backend: (),
            config: ExpanderConfig::default(),
        };
        let listing = expander.summarize_graph(&graph);
        assert_eq!(listing.lines().count(), 3);
        assert!(listing.contains("- concept_0: Concept 0"));
        assert!(!listing.contains("omitted for brevity"));
    }

    #[test]
    fn summary_marks_omitted_concepts() {
        let graph = seeded_graph(200);
        let expander = GraphExpander {
            backend: (),
            config: ExpanderConfig::default(),
        };
        let listing = expander.summarize_graph(&graph);
        assert!(listing.contains("more concepts (omitted for brevity)"));
        let body_len: usize = listing
            .lines()
            .filter(|l| l.starts_with("- "))
            .map(|l| l.chars().count() + 1)
            .sum();
        assert!(body_len <= expander.config.concept_budget + 1);
    }

    #[test]
    fn description_truncated_in_summary() {
        let mut graph = KnowledgeGraph::new();
        graph.add_concept(
            ConceptNode::new("long", "Long", ConceptType::Theory, ConceptLevel::Advanced)
                .with_description("x".repeat(500)),
        );
        let expander = GraphExpander {
            backend: (),
            config: ExpanderConfig::default(),
        };
        let listing = expander.summarize_graph(&graph);
        let line = listing.lines().next().unwrap();
        assert!(line.chars().count() < 200);
    }
}
