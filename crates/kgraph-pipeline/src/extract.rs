//! Concept extraction pipeline
//!
//! Turns a repository analysis document into an initial knowledge graph
//! via one LLM call, with two recovery paths:
//!
//! - an empty first response retries once with a radically simplified
//!   prompt and a larger completion budget
//! - a truncated or thin first response triggers a continuation pass
//!   whose output is merged in, first document winning collisions
//!
//! Prompt sections are budgeted by character count so large analysis
//! documents degrade to "most important first" instead of failing.

use crate::analysis::{ComponentInfo, RepoAnalysis};
use crate::decode::{decode_edge, decode_node, NodeDefaults};
use crate::error::PipelineError;
use crate::prompts::{self, DomainHints, Section};
use kgraph_core::{ConceptLevel, ConceptType, KnowledgeGraph};
use kgraph_llm::{parse_json_response, ChatBackend, ChatRequest};
use serde_json::{Map, Value};
use std::collections::HashSet;

const SIMPLIFIED_COMPONENT_COUNT: usize = 30;
const CONTINUATION_ID_COUNT: usize = 50;
const DOC_SUMMARY_CHARS: usize = 200;

/// Tuning knobs for the extraction pipeline
#[derive(Debug, Clone, Copy)]
pub struct ExtractorConfig {
    /// Character budget per prompt section
    pub section_budget: usize,
    /// Node count below which a continuation pass is made
    pub min_nodes: usize,
    /// Completion budget for the main call
    pub max_tokens: u32,
    /// Completion budget for the simplified retry
    pub retry_max_tokens: u32,
    /// Sampling temperature for all calls
    pub temperature: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            section_budget: 3000,
            min_nodes: 20,
            max_tokens: 8192,
            retry_max_tokens: 16384,
            temperature: 0.3,
        }
    }
}

/// Extraction defaults: uncredited nodes are assumed established theory.
const EXTRACT_DEFAULTS: NodeDefaults = NodeDefaults {
    kind: ConceptType::Theory,
    level: ConceptLevel::Intermediate,
    confidence: 1.0,
};

/// Extracts an initial knowledge graph from a repository analysis
pub struct ConceptExtractor<B> {
    backend: B,
    config: ExtractorConfig,
}

impl<B: ChatBackend> ConceptExtractor<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: ExtractorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run extraction against one analysis document
    ///
    /// # Errors
    /// - `PipelineError::Backend` if a backend call fails; malformed
    ///   responses are absorbed and yield a smaller (possibly empty)
    ///   graph instead
    pub async fn extract(&self, analysis: &RepoAnalysis) -> Result<KnowledgeGraph, PipelineError> {
        let hints = DomainHints::for_kind(analysis.repo_kind);
        let system = prompts::extraction_system_prompt(&hints);

        let components = self.select_components(analysis, &hints);
        let commits = self.select_commits(analysis);
        let docs = self.select_docs(analysis);
        let structure = self.select_structure(analysis);
        let dependencies = format_dependencies(analysis);

        let user = prompts::extraction_user_prompt(
            analysis.repo_kind,
            &analysis.repo_path,
            &components,
            &structure,
            &dependencies,
            &commits,
            &docs,
            hints.technique_hint,
        );

        tracing::info!(
            "Extracting concepts from {} ({} repo)",
            analysis.repo_path,
            analysis.repo_kind
        );

        let request = ChatRequest::new(system.clone(), user)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        let response = self.backend.chat(request).await?;
        let mut doc = parse_json_response(&response.text);

        if node_count(&doc) == 0 {
            tracing::warn!("Empty extraction result, retrying with simplified prompt");
            doc = self.retry_simplified(analysis, &system).await?;
        } else if response.finish.is_truncated() || node_count(&doc) < self.config.min_nodes {
            tracing::info!(
                "First pass yielded {} nodes (truncated: {}), running continuation pass",
                node_count(&doc),
                response.finish.is_truncated()
            );
            let second = self.continuation_pass(analysis, &system, &hints, &doc).await?;
            doc = merge_documents(doc, second);
        }

        tracing::info!("Extraction produced {} raw nodes", node_count(&doc));
        Ok(build_graph(&doc))
    }

    /// Retry with a one-line prompt naming only the top components.
    async fn retry_simplified(
        &self,
        analysis: &RepoAnalysis,
        system: &str,
    ) -> Result<Map<String, Value>, PipelineError> {
        let top: Vec<&str> = analysis
            .components
            .iter()
            .take(SIMPLIFIED_COMPONENT_COUNT)
            .map(|c| c.name.as_str())
            .collect();
        let user = prompts::simplified_retry_prompt(analysis.repo_kind, &top.join(", "));

        let request = ChatRequest::new(system.to_string(), user)
            .with_max_tokens(self.config.retry_max_tokens)
            .with_temperature(self.config.temperature);
        let response = self.backend.chat(request).await?;
        Ok(parse_json_response(&response.text))
    }

    /// Ask for concepts missing from what the first pass already found.
    async fn continuation_pass(
        &self,
        analysis: &RepoAnalysis,
        system: &str,
        hints: &DomainHints,
        first: &Map<String, Value>,
    ) -> Result<Map<String, Value>, PipelineError> {
        let ids: Vec<&str> = first
            .get("nodes")
            .and_then(Value::as_array)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| n.get("id").and_then(Value::as_str))
                    .take(CONTINUATION_ID_COUNT)
                    .collect()
            })
            .unwrap_or_default();
        let user =
            prompts::continuation_prompt(analysis.repo_kind, &ids.join(", "), hints.technique_hint);

        let request = ChatRequest::new(system.to_string(), user)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        let response = self.backend.chat(request).await?;
        Ok(parse_json_response(&response.text))
    }
}

impl<B> ConceptExtractor<B> {
    fn select_components(&self, analysis: &RepoAnalysis, hints: &DomainHints) -> Section {
        let mut ranked: Vec<&ComponentInfo> = analysis.components.iter().collect();
        ranked.sort_by_key(|c| importance_rank(&c.name, hints.important_suffixes));

        self.fill_section(
            analysis.components.len(),
            ranked.iter().map(|c| {
                let bases = c.bases();
                if bases.is_empty() {
                    format!("- {} ({}) at {}", c.name, c.kind, c.path)
                } else {
                    format!(
                        "- {} ({}) at {}, extends {}",
                        c.name,
                        c.kind,
                        c.path,
                        bases.join(", ")
                    )
                }
            }),
        )
    }

    fn select_commits(&self, analysis: &RepoAnalysis) -> Section {
        let mut ranked: Vec<_> = analysis.commits.iter().collect();
        ranked.sort_by_key(|c| std::cmp::Reverse(c.tags.len()));

        self.fill_section(
            analysis.commits.len(),
            ranked.iter().map(|c| {
                if c.tags.is_empty() {
                    format!("- [{}] {}", c.date, c.message)
                } else {
                    format!("- [{}] {} (tags: {})", c.date, c.message, c.tags.join(", "))
                }
            }),
        )
    }

    fn select_docs(&self, analysis: &RepoAnalysis) -> Section {
        self.fill_section(
            analysis.documentation.len(),
            analysis.documentation.iter().map(|d| {
                let summary: String = d.summary.chars().take(DOC_SUMMARY_CHARS).collect();
                format!("- {} ({}): {}", d.title, d.category, summary)
            }),
        )
    }

    fn select_structure(&self, analysis: &RepoAnalysis) -> String {
        let lines = analysis.structure.iter().map(|(class, info)| {
            let inherits: Vec<&str> = info
                .get("inherits")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let file = info.get("file").and_then(Value::as_str).unwrap_or("?");
            if inherits.is_empty() {
                format!("- {class} ({file})")
            } else {
                format!("- {class} inherits {} ({file})", inherits.join(", "))
            }
        });
        self.fill_section(analysis.structure.len(), lines).text
    }

    /// Append lines until the per-section character budget runs out.
    fn fill_section(&self, total: usize, lines: impl Iterator<Item = String>) -> Section {
        let mut text = String::new();
        let mut shown = 0;
        for line in lines {
            if !text.is_empty() && text.chars().count() + line.chars().count() + 1
                > self.config.section_budget
            {
                break;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&line);
            shown += 1;
        }
        Section { text, total, shown }
    }
}

/// Rank of the first matching important suffix; unmatched names sink.
fn importance_rank(name: &str, suffixes: &[&str]) -> usize {
    suffixes
        .iter()
        .position(|suffix| name.ends_with(suffix))
        .unwrap_or(suffixes.len())
}

fn format_dependencies(analysis: &RepoAnalysis) -> String {
    analysis
        .dependencies
        .iter()
        .filter(|(_, libs)| !libs.is_empty())
        .map(|(category, libs)| format!("- {category}: {}", libs.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn node_count(doc: &Map<String, Value>) -> usize {
    doc.get("nodes").and_then(Value::as_array).map_or(0, Vec::len)
}

/// Merge two raw extraction documents, the first winning collisions
///
/// Nodes collide on `id`, edges on (source, target, relationship).
fn merge_documents(first: Map<String, Value>, second: Map<String, Value>) -> Map<String, Value> {
    let mut nodes: Vec<Value> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    for node in raw_array(&first, "nodes").iter().chain(raw_array(&second, "nodes")) {
        let Some(id) = node.get("id").and_then(Value::as_str) else {
            nodes.push(node.clone());
            continue;
        };
        if seen_ids.insert(id.to_string()) {
            nodes.push(node.clone());
        }
    }

    let mut edges: Vec<Value> = Vec::new();
    let mut seen_edges: HashSet<(String, String, String)> = HashSet::new();
    for edge in raw_array(&first, "edges").iter().chain(raw_array(&second, "edges")) {
        let key = (
            edge.get("source").and_then(Value::as_str).unwrap_or("").to_string(),
            edge.get("target").and_then(Value::as_str).unwrap_or("").to_string(),
            edge.get("relationship")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        );
        if seen_edges.insert(key) {
            edges.push(edge.clone());
        }
    }

    let mut merged = Map::new();
    merged.insert("nodes".to_string(), Value::Array(nodes));
    merged.insert("edges".to_string(), Value::Array(edges));
    merged
}

fn raw_array<'a>(doc: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    doc.get(key).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// Decode a raw extraction document into a graph, skipping bad entities.
fn build_graph(doc: &Map<String, Value>) -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    for raw in raw_array(doc, "nodes") {
        if let Some(node) = decode_node(raw, EXTRACT_DEFAULTS) {
            graph.add_concept(node);
        }
    }
    for raw in raw_array(doc, "edges") {
        if let Some(edge) = decode_edge(raw) {
            if let Err(err) = graph.add_edge(edge) {
                tracing::warn!("Skipping edge: {err}");
            }
        }
    }
    graph
}
