//! Response resilience layer
//!
//! Turns raw model output into a structured JSON document, tolerating
//! the two common failure shapes of LLM responses:
//! - the payload wrapped in (possibly nested) markdown code fences
//! - the payload clipped mid-output by the max-token limit
//!
//! Pure function of its input: no state, no side effects beyond
//! logging, and it never fails. Unrecoverable input degrades to an
//! empty document.

use serde_json::{Map, Value};

/// Cap on the response excerpt written to the debug log.
const LOG_EXCERPT_CHARS: usize = 500;

/// Parse a model response into a JSON object, best effort
///
/// Strips an enclosing code fence, then tries a direct parse, then a
/// truncation repair. Returns an empty document if nothing parses (or
/// if the payload is valid JSON but not an object).
#[must_use]
pub fn parse_json_response(text: &str) -> Map<String, Value> {
    for candidate in fence_candidates(text) {
        if let Some(doc) = try_parse(candidate) {
            return doc;
        }
    }

    tracing::error!("Failed to parse LLM response as JSON (len={})", text.len());
    let excerpt: String = text.chars().take(LOG_EXCERPT_CHARS).collect();
    tracing::debug!("Response text: {excerpt}");
    Map::new()
}

/// Candidate payloads after fence stripping, in priority order
///
/// The closing delimiter is the *last* fence in the text, because the
/// JSON value itself may contain nested fenced blocks; cutting at the
/// first inner fence would truncate the payload. If the last-fence cut
/// does not parse, the first-fence cut is tried as a fallback (covers
/// responses with trailing fenced commentary after the JSON block).
fn fence_candidates(text: &str) -> Vec<&str> {
    let text = text.trim();

    let body = if let Some(idx) = text.find("```json") {
        &text[idx + 7..]
    } else if let Some(idx) = text.find("```") {
        &text[idx + 3..]
    } else {
        return vec![text];
    };

    let mut candidates = Vec::new();
    match body.rfind("```") {
        Some(last) => {
            candidates.push(body[..last].trim());
            if let Some(first) = body.find("```") {
                if first != last {
                    candidates.push(body[..first].trim());
                }
            }
        }
        // No closing fence at all (truncated output): take the rest.
        None => candidates.push(body.trim()),
    }
    candidates
}

/// Try direct parse, then truncation repair
fn try_parse(text: &str) -> Option<Map<String, Value>> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return into_object(value);
    }
    let repaired = repair_truncated_json(text)?;
    let value = serde_json::from_str::<Value>(&repaired).ok()?;
    into_object(value)
}

fn into_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        other => {
            tracing::warn!(
                "Parsed response is not a JSON object (got {})",
                json_type_name(&other)
            );
            None
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Best-effort repair of JSON clipped by the output-length limit
///
/// Scans once, tracking whether the cursor is inside a quoted string
/// (honoring escape sequences) and, outside strings, a stack of open
/// braces and brackets. Closes an unterminated string, then unwinds
/// the stack so structures close innermost-first.
fn repair_truncated_json(text: &str) -> Option<String> {
    let text = text.trim();
    if !text.starts_with('{') {
        return None;
    }

    let bytes = text.as_bytes();
    let mut in_string = false;
    let mut open: Vec<u8> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'\\' && in_string {
            i += 2; // skip escaped byte
            continue;
        }
        if c == b'"' {
            in_string = !in_string;
        } else if !in_string {
            match c {
                b'{' | b'[' => open.push(c),
                b'}' | b']' => {
                    open.pop();
                }
                _ => {}
            }
        }
        i += 1;
    }

    let mut repaired = text.to_string();
    if in_string {
        repaired.push('"');
    }
    while let Some(delim) = open.pop() {
        repaired.push(if delim == b'{' { '}' } else { ']' });
    }

    Some(repaired)
}
