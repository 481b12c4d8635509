//! End-to-end pipeline tests against a scripted backend

use async_trait::async_trait;
use kgraph_core::{ConceptLevel, ConceptType, KnowledgeGraph, RelationshipType};
use kgraph_llm::{BackendError, ChatBackend, ChatRequest, ChatResponse, FinishReason};
use kgraph_pipeline::{
    CommitInfo, ComponentInfo, ConceptExtractor, ExpanderConfig, GraphExpander, RepoAnalysis,
    RepoKind,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Backend that replays a fixed sequence of responses and records the
/// prompts it was sent.
struct ScriptedBackend {
    responses: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ChatRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BackendError::Malformed("script exhausted".to_string()))
    }
}

fn stop(text: impl Into<String>) -> ChatResponse {
    ChatResponse {
        text: text.into(),
        finish: FinishReason::Stop,
    }
}

fn truncated(text: impl Into<String>) -> ChatResponse {
    ChatResponse {
        text: text.into(),
        finish: FinishReason::Length,
    }
}

fn sample_analysis() -> RepoAnalysis {
    let mut analysis = RepoAnalysis::new(RepoKind::Huggingface, "/repos/transformers");
    analysis.components.push(ComponentInfo {
        name: "BertModel".to_string(),
        path: "src/bert.py".to_string(),
        kind: "class".to_string(),
        metadata: serde_json::json!({"bases": ["PreTrainedModel"]}),
    });
    analysis.components.push(ComponentInfo {
        name: "GptModel".to_string(),
        path: "src/gpt.py".to_string(),
        kind: "class".to_string(),
        metadata: serde_json::Value::Null,
    });
    analysis.commits.push(CommitInfo {
        sha: "abc1234".to_string(),
        date: "2026-02-10".to_string(),
        message: "Add rotary embeddings".to_string(),
        author: "dev".to_string(),
        tags: vec!["architecture".to_string()],
        metadata: serde_json::Value::Null,
    });
    analysis
        .dependencies
        .insert("frameworks".to_string(), vec!["torch".to_string()]);
    analysis
}

fn nodes_json(ids: &[&str]) -> String {
    let nodes: Vec<_> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "name": id.to_uppercase(),
                "type": "technique",
                "level": "intermediate",
            })
        })
        .collect();
    serde_json::json!({"nodes": nodes, "edges": []}).to_string()
}

#[tokio::test]
async fn truncated_first_pass_merges_continuation() {
    // First pass is truncated after two nodes; continuation returns one
    // overlap and one new node. Merge keeps the first-pass version.
    let first = serde_json::json!({
        "nodes": [
            {"id": "attention", "name": "Attention (pass 1)"},
            {"id": "transformer", "name": "Transformer"},
        ],
        "edges": [
            {"source": "transformer", "target": "attention", "relationship": "requires"},
        ],
    });
    let second = serde_json::json!({
        "nodes": [
            {"id": "attention", "name": "Attention (pass 2)"},
            {"id": "rotary_embeddings", "name": "Rotary Embeddings"},
        ],
        "edges": [],
    });

    let backend = ScriptedBackend::new(vec![
        truncated(first.to_string()),
        stop(second.to_string()),
    ]);
    let extractor = ConceptExtractor::new(&backend);
    let graph = extractor.extract(&sample_analysis()).await.unwrap();

    assert_eq!(backend.calls(), 2);
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.get_concept("attention").unwrap().name, "Attention (pass 1)");
    assert_eq!(graph.edges().len(), 1);

    let continuation = backend.request(1);
    assert!(continuation.user.contains("attention, transformer"));
}

#[tokio::test]
async fn empty_first_pass_triggers_simplified_retry() {
    let backend = ScriptedBackend::new(vec![
        stop("I cannot answer that as JSON, sorry."),
        stop(nodes_json(&["bert", "gpt"])),
    ]);
    let extractor = ConceptExtractor::new(&backend);
    let graph = extractor.extract(&sample_analysis()).await.unwrap();

    assert_eq!(backend.calls(), 2);
    assert_eq!(graph.len(), 2);

    let retry = backend.request(1);
    assert!(retry.user.contains("BertModel"));
    assert_eq!(retry.max_tokens, 16384);
}

#[tokio::test]
async fn thin_first_pass_runs_continuation() {
    // Below the 20-node default threshold even though not truncated.
    let backend = ScriptedBackend::new(vec![
        stop(nodes_json(&["attention"])),
        stop(nodes_json(&["kv_cache"])),
    ]);
    let extractor = ConceptExtractor::new(&backend);
    let graph = extractor.extract(&sample_analysis()).await.unwrap();

    assert_eq!(backend.calls(), 2);
    assert_eq!(graph.len(), 2);
}

#[tokio::test]
async fn healthy_first_pass_is_single_call() {
    let ids: Vec<String> = (0..25).map(|i| format!("concept_{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let backend = ScriptedBackend::new(vec![stop(nodes_json(&id_refs))]);

    let extractor = ConceptExtractor::new(&backend);
    let graph = extractor.extract(&sample_analysis()).await.unwrap();

    assert_eq!(backend.calls(), 1);
    assert_eq!(graph.len(), 25);

    let request = backend.request(0);
    assert!(request.system.contains("machine learning"));
    assert!(request.user.contains("Repository type: huggingface"));
}

#[tokio::test]
async fn expansion_halts_after_empty_round() {
    let round = serde_json::json!({
        "new_nodes": [],
        "new_edges": [],
    });
    let backend = ScriptedBackend::new(vec![stop(round.to_string()), stop(round.to_string())]);

    let mut graph = KnowledgeGraph::new();
    graph.add_concept(kgraph_core::ConceptNode::new(
        "attention",
        "Attention",
        ConceptType::Theory,
        ConceptLevel::Foundational,
    ));

    let expander = GraphExpander::new(&backend);
    let report = expander.expand(&mut graph).await.unwrap();

    // Second scripted round never requested.
    assert_eq!(backend.calls(), 1);
    assert_eq!(report.rounds_run, 1);
    assert_eq!(report.nodes_added, 0);
    assert_eq!(graph.len(), 1);
}

#[tokio::test]
async fn expansion_validates_and_caps_confidence() {
    let round1 = serde_json::json!({
        "new_nodes": [
            {"id": "attention", "name": "Duplicate of existing"},
            {"id": "mamba", "name": "Mamba", "confidence": 1.0},
            {"id": "rwkv", "name": "RWKV"},
        ],
        "new_edges": [
            {"source": "mamba", "target": "attention", "relationship": "alternative_to"},
            {"source": "mamba", "target": "nonexistent", "relationship": "requires"},
        ],
    });
    let round2 = serde_json::json!({"new_nodes": [], "new_edges": []});
    let backend = ScriptedBackend::new(vec![stop(round1.to_string()), stop(round2.to_string())]);

    let mut graph = KnowledgeGraph::new();
    graph.add_concept(kgraph_core::ConceptNode::new(
        "attention",
        "Attention",
        ConceptType::Theory,
        ConceptLevel::Foundational,
    ));

    let expander = GraphExpander::new(&backend);
    let report = expander.expand(&mut graph).await.unwrap();

    assert_eq!(report.rounds_run, 2);
    assert_eq!(report.nodes_added, 2);
    assert_eq!(report.edges_added, 1);

    // Existing node untouched, inferred confidence capped below 1.0.
    assert_eq!(graph.get_concept("attention").unwrap().name, "Attention");
    let mamba = graph.get_concept("mamba").unwrap();
    assert_eq!(mamba.confidence, 0.99);
    assert_eq!(mamba.kind, ConceptType::Architecture);
    assert_eq!(mamba.level, ConceptLevel::Frontier);
}

#[tokio::test]
async fn expansion_respects_round_budget() {
    let make_round = |id: &str| {
        serde_json::json!({
            "new_nodes": [{"id": id, "name": id}],
            "new_edges": [],
        })
        .to_string()
    };
    let backend = ScriptedBackend::new(vec![
        stop(make_round("ssm")),
        stop(make_round("moe")),
        stop(make_round("never_requested")),
    ]);

    let mut graph = KnowledgeGraph::new();
    graph.add_concept(kgraph_core::ConceptNode::new(
        "attention",
        "Attention",
        ConceptType::Theory,
        ConceptLevel::Foundational,
    ));

    let expander =
        GraphExpander::new(&backend).with_config(ExpanderConfig::default());
    let report = expander.expand(&mut graph).await.unwrap();

    assert_eq!(backend.calls(), 2);
    assert_eq!(report.nodes_added, 2);
    assert_eq!(graph.len(), 3);
}

#[tokio::test]
async fn extract_then_expand_round_trips() {
    let extraction = serde_json::json!({
        "nodes": [
            {"id": "attention", "name": "Attention", "level": "foundational"},
            {"id": "transformer", "name": "Transformer", "type": "architecture"},
        ],
        "edges": [
            {"source": "transformer", "target": "attention", "relationship": "requires"},
        ],
    });
    let expansion = serde_json::json!({
        "new_nodes": [
            {"id": "flash_attention", "name": "Flash Attention", "type": "optimization"},
        ],
        "new_edges": [
            {"source": "flash_attention", "target": "attention", "relationship": "optimizes"},
        ],
    });
    let halt = serde_json::json!({"new_nodes": [], "new_edges": []});

    let backend = ScriptedBackend::new(vec![
        stop(extraction.to_string()),
        stop(expansion.to_string()),
        stop(halt.to_string()),
    ]);

    let mut analysis = sample_analysis();
    // Enough padding nodes are not needed; lower the threshold instead.
    let config = kgraph_pipeline::ExtractorConfig {
        min_nodes: 2,
        ..Default::default()
    };
    let extractor = ConceptExtractor::new(&backend).with_config(config);
    analysis.repo_kind = RepoKind::Huggingface;
    let mut graph = extractor.extract(&analysis).await.unwrap();

    let expander = GraphExpander::new(&backend);
    expander.expand(&mut graph).await.unwrap();

    assert_eq!(graph.len(), 3);
    assert_eq!(graph.edges().len(), 2);
    assert_eq!(
        graph.edges()[1].relationship,
        RelationshipType::Optimizes
    );

    // Provenance survives a serialization round trip.
    let json = graph.to_json();
    let back = KnowledgeGraph::from_json(&json);
    assert_eq!(back.len(), 3);
    assert_eq!(back.get_concept("flash_attention").unwrap().confidence, 0.8);
    assert_eq!(back.get_concept("attention").unwrap().confidence, 1.0);
    assert_eq!(back.topological_sort()[0], "attention");
}
