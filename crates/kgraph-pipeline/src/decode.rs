//! Lenient decoding of LLM-authored node and edge values
//!
//! The two pipelines share the same tolerance policy but different
//! defaults: a missing enum field falls back to the pipeline's default,
//! while an *invalid* enum value rejects the whole entity. Rejections
//! are per-entity and logged, never fatal.

use kgraph_core::{ConceptLevel, ConceptNode, ConceptType, Edge, RelationshipType};
use serde_json::Value;

/// Fallback values applied while decoding a node
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeDefaults {
    pub(crate) kind: ConceptType,
    pub(crate) level: ConceptLevel,
    pub(crate) confidence: f64,
}

/// Decode one node value, applying defaults for absent fields
///
/// Returns `None` (with a warning) when a required field is missing or
/// an enum value is outside its fixed set.
pub(crate) fn decode_node(raw: &Value, defaults: NodeDefaults) -> Option<ConceptNode> {
    let id = match raw.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id,
        _ => {
            tracing::warn!("Skipping node without id");
            return None;
        }
    };
    let Some(name) = raw.get("name").and_then(Value::as_str) else {
        tracing::warn!("Skipping node {id}: missing name");
        return None;
    };

    let kind = match decode_enum(raw.get("type"), defaults.kind) {
        Ok(kind) => kind,
        Err(()) => {
            tracing::warn!("Skipping node {id}: invalid type {:?}", raw.get("type"));
            return None;
        }
    };
    let level = match decode_enum(raw.get("level"), defaults.level) {
        Ok(level) => level,
        Err(()) => {
            tracing::warn!("Skipping node {id}: invalid level {:?}", raw.get("level"));
            return None;
        }
    };

    Some(ConceptNode {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        level,
        description: str_field(raw, "description"),
        key_ideas: str_list(raw, "key_ideas"),
        code_refs: str_list(raw, "code_refs"),
        paper_ref: str_field(raw, "paper_ref"),
        first_appeared: raw
            .get("first_appeared")
            .and_then(Value::as_str)
            .map(str::to_string),
        confidence: raw
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(defaults.confidence),
    })
}

/// Decode one edge value
///
/// Endpoint existence is the caller's concern; this only checks shape
/// and the relationship enum (absent -> `builds_on`, invalid -> reject).
pub(crate) fn decode_edge(raw: &Value) -> Option<Edge> {
    let Some(source) = raw.get("source").and_then(Value::as_str) else {
        tracing::warn!("Skipping edge: missing source");
        return None;
    };
    let Some(target) = raw.get("target").and_then(Value::as_str) else {
        tracing::warn!("Skipping edge: missing target");
        return None;
    };
    let relationship = match decode_enum(raw.get("relationship"), RelationshipType::BuildsOn) {
        Ok(relationship) => relationship,
        Err(()) => {
            tracing::warn!(
                "Skipping edge {source}->{target}: invalid relationship {:?}",
                raw.get("relationship")
            );
            return None;
        }
    };

    Some(Edge {
        source: source.to_string(),
        target: target.to_string(),
        relationship,
        description: str_field(raw, "description"),
    })
}

/// Absent field -> default; present but invalid -> Err (reject entity)
fn decode_enum<T: serde::de::DeserializeOwned>(raw: Option<&Value>, default: T) -> Result<T, ()> {
    match raw {
        None | Some(Value::Null) => Ok(default),
        Some(value) => serde_json::from_value(value.clone()).map_err(|_| ()),
    }
}

fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn str_list(raw: &Value, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
