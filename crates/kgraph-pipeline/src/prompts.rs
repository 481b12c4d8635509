//! Prompt templates for extraction and expansion
//!
//! The concept enumerations are injected live from `kgraph-core`, so
//! prompts never drift from what the decoder accepts.

use crate::analysis::RepoKind;
use kgraph_core::{ConceptLevel, ConceptType, RelationshipType};

/// Edge direction contract, repeated verbatim to both pipelines.
const DIRECTION_RULES: &str = "\
Edge direction rules (IMPORTANT — get the direction right):
- component_of: child → parent  (e.g. attention_mechanism → transformer_architecture)
- optimizes: technique → target  (e.g. flash_attention → attention_mechanism)
- builds_on / evolves_to: derived → base  (e.g. gpt → transformer_architecture)
- variant_of: variant → original  (e.g. bert → transformer_architecture)
- requires: dependent → dependency  (e.g. fine_tuning → pre_trained_model)";

fn type_list() -> String {
    ConceptType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn level_list() -> String {
    ConceptLevel::ALL
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn relationship_list() -> String {
    RelationshipType::ALL
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Repo-kind-specific prompt phrasing
#[derive(Debug, Clone, Copy)]
pub(crate) struct DomainHints {
    pub(crate) domain_context: &'static str,
    pub(crate) technique_hint: &'static str,
    pub(crate) important_suffixes: &'static [&'static str],
}

const ML_SUFFIXES: &[&str] = &[
    "Model",
    "ForSequenceClassification",
    "ForCausalLM",
    "ForMaskedLM",
    "ForTokenClassification",
    "Config",
    "Tokenizer",
    "ForQuestionAnswering",
    "PreTrainedModel",
];

const GENERIC_SUFFIXES: &[&str] = &[
    "Manager",
    "Handler",
    "Service",
    "Controller",
    "Factory",
    "Builder",
    "Processor",
    "Parser",
    "Middleware",
    "Router",
    "Registry",
];

impl DomainHints {
    /// ML repositories get ML phrasing with concrete model examples;
    /// everything else gets neutral wording.
    pub(crate) fn for_kind(kind: RepoKind) -> Self {
        if kind.is_ml() {
            Self {
                domain_context: " and machine learning",
                technique_hint: " — include concrete model instances (e.g. BERT, GPT, T5, LoRA) \
                                 as well as foundational abstractions",
                important_suffixes: ML_SUFFIXES,
            }
        } else {
            Self {
                domain_context: "",
                technique_hint: " — include concrete named components and design patterns \
                                 present in this codebase",
                important_suffixes: GENERIC_SUFFIXES,
            }
        }
    }
}

pub(crate) fn extraction_system_prompt(hints: &DomainHints) -> String {
    format!(
        "You are an expert in software architecture{domain_context}. Given analysis data \
from a code repository, extract a knowledge graph of concepts and their relationships.

For each concept, provide:
- id: snake_case identifier
- name: human-readable name
- type: one of {types}
- level: one of {levels}
- description: 1-2 sentence description
- key_ideas: list of 2-4 key ideas
- code_refs: list of relevant file:class references from the repo
- paper_ref: the seminal paper (REQUIRED for every concept; use \"\" only if truly no \
paper exists), e.g. \"Vaswani et al., 2017 — Attention Is All You Need\"

For each relationship (edge), provide:
- source: concept id
- target: concept id
- relationship: one of {relationships}
- description: brief description of the relationship

{direction_rules}

Focus on:
1. Core architectural concepts (key abstractions, patterns, data flows)
2. Main components and their roles
3. Key techniques and algorithms implemented{technique_hint}
4. Training / optimization innovations
5. Prerequisite chains (what must you understand before what)

Return ONLY valid JSON with keys \"nodes\" and \"edges\". No other text.",
        domain_context = hints.domain_context,
        types = type_list(),
        levels = level_list(),
        relationships = relationship_list(),
        direction_rules = DIRECTION_RULES,
        technique_hint = hints.technique_hint,
    )
}

/// One truncated prompt section plus the counts shown to the model
#[derive(Debug, Clone, Default)]
pub(crate) struct Section {
    pub(crate) text: String,
    pub(crate) total: usize,
    pub(crate) shown: usize,
}

fn or_none(text: &str) -> &str {
    if text.is_empty() {
        "(none found)"
    } else {
        text
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn extraction_user_prompt(
    repo_kind: RepoKind,
    repo_path: &str,
    components: &Section,
    structure: &str,
    dependencies: &str,
    commits: &Section,
    docs: &Section,
    technique_hint: &str,
) -> String {
    format!(
        "Here is the analysis of the repository:

## Repository type: {repo_kind}
## Repository path: {repo_path}

## Key components ({num_components} total, showing first {shown_components}):
{components_text}

## Class hierarchy / structure:
{structure_text}

## Dependencies:
{dependencies_text}

## Key commits ({num_commits} total, showing first {shown_commits}):
{commits_text}

## Documentation ({num_docs} total, showing first {shown_docs}):
{docs_text}

Extract a comprehensive knowledge graph of concepts and their relationships. \
Include both foundational abstractions AND concrete named techniques{technique_hint} \
that are present or referenced in the repo. \
Ensure proper prerequisite chains. Every node MUST have a paper_ref where one exists.

Return ONLY valid JSON with keys \"nodes\" and \"edges\".",
        num_components = components.total,
        shown_components = components.shown,
        components_text = or_none(&components.text),
        structure_text = or_none(structure),
        dependencies_text = or_none(dependencies),
        num_commits = commits.total,
        shown_commits = commits.shown,
        commits_text = or_none(&commits.text),
        num_docs = docs.total,
        shown_docs = docs.shown,
        docs_text = or_none(&docs.text),
    )
}

pub(crate) fn simplified_retry_prompt(repo_kind: RepoKind, top_components: &str) -> String {
    format!(
        "Extract 30-40 key concepts from the {repo_kind} repository. \
Key components include: {top_components}. \
Return ONLY valid JSON with keys 'nodes' and 'edges'."
    )
}

pub(crate) fn continuation_prompt(
    repo_kind: RepoKind,
    extracted_ids: &str,
    technique_hint: &str,
) -> String {
    format!(
        "The following concepts were already extracted from the {repo_kind} repository: \
{extracted_ids}.
Extract any ADDITIONAL concepts not yet in that list. Focus on:
1. Concrete named components and techniques not yet covered{technique_hint}
2. Components and techniques not covered above
IMPORTANT: Every node MUST include paper_ref (use \"\" only if truly no paper exists).
Return ONLY valid JSON with keys 'nodes' and 'edges'."
    )
}

pub(crate) fn expansion_system_prompt() -> String {
    format!(
        "You are a knowledge graph expansion expert. Given a set of existing concepts \
in a knowledge graph, identify NEW frontier concepts that logically extend this graph.

Your goal is to:
1. Infer the domain from the existing concepts
2. Identify advanced or frontier concepts in that domain that are missing
3. Add concepts that form meaningful prerequisite chains with existing ones

For each new concept, provide:
- id: snake_case identifier
- name: human-readable name
- type: one of {types}
- level: one of {levels}
- description: 1-2 sentence description
- key_ideas: list of 2-4 key ideas
- paper_ref: seminal paper if applicable (e.g. \"Author et al., YEAR — Title\"), or \"\"
- confidence: float 0.0-1.0 (how certain this belongs in the graph)

For each new edge, provide:
- source: concept id
- target: concept id
- relationship: one of {relationships}
- description: brief description

{direction_rules}

Return ONLY valid JSON with keys \"new_nodes\" and \"new_edges\". No other text.",
        types = type_list(),
        levels = level_list(),
        relationships = relationship_list(),
        direction_rules = DIRECTION_RULES,
    )
}

pub(crate) fn expansion_user_prompt(
    num_existing: usize,
    existing_concepts: &str,
    num_new: usize,
) -> String {
    format!(
        "Here are the existing {num_existing} concepts in the knowledge graph:

{existing_concepts}

Identify {num_new} new concepts that extend this knowledge graph. Focus on:
- Advanced and frontier concepts that build on existing foundational ones
- Concepts that fill visible gaps in the prerequisite chain
- Cutting-edge techniques and recent innovations in this domain

Return ONLY valid JSON with keys \"new_nodes\" and \"new_edges\"."
    )
}
