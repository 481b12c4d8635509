//! Repository analysis document model
//!
//! The external input consumed by extraction: a structured summary of a
//! repository produced by a type-specific analyzer (out of scope here;
//! see `registry`). The serialized field names are shared with those
//! analyzers and must stay stable.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Detected repository type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoKind {
    Huggingface,
    Pytorch,
    PythonLib,
    WebFramework,
    Javascript,
    Generic,
}

impl RepoKind {
    /// Serialized name of this repository type
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Huggingface => "huggingface",
            Self::Pytorch => "pytorch",
            Self::PythonLib => "python_lib",
            Self::WebFramework => "web_framework",
            Self::Javascript => "javascript",
            Self::Generic => "generic",
        }
    }

    /// Whether this repository type warrants ML-specific prompt hints
    #[inline]
    #[must_use]
    pub fn is_ml(&self) -> bool {
        matches!(self, Self::Huggingface | Self::Pytorch)
    }
}

impl std::fmt::Display for RepoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component found in the repository (class, function, module, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Component name (e.g. "BertModel")
    pub name: String,
    /// File path relative to the repo root
    pub path: String,
    /// "class", "function", "module" or "package"
    #[serde(rename = "type")]
    pub kind: String,
    /// Extended info (line number, methods, base classes, ...)
    #[serde(default)]
    pub metadata: Value,
}

impl ComponentInfo {
    /// Base classes recorded by the analyzer, if any
    #[must_use]
    pub fn bases(&self) -> Vec<&str> {
        self.metadata
            .get("bases")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// A commit matched by the analyzer's keyword scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Abbreviated commit SHA
    pub sha: String,
    /// Commit date (YYYY-MM-DD)
    pub date: String,
    /// Commit message, pre-truncated by the analyzer
    pub message: String,
    /// Commit author
    pub author: String,
    /// Matched keywords (e.g. "architecture", "optimization")
    #[serde(default)]
    pub tags: Vec<String>,
    /// Additional info
    #[serde(default)]
    pub metadata: Value,
}

/// A documentation file summarized by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocInfo {
    /// Documentation file path
    pub path: String,
    /// Document title
    pub title: String,
    /// Summary text, pre-truncated by the analyzer
    pub summary: String,
    /// "api", "tutorial", "guide" or "model"
    pub category: String,
    /// Additional info
    #[serde(default)]
    pub metadata: Value,
}

/// Full analysis document for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoAnalysis {
    /// Detected repository type
    #[serde(rename = "repo_type")]
    pub repo_kind: RepoKind,
    /// Analyzed repository path
    pub repo_path: String,
    /// Key components
    #[serde(default)]
    pub components: Vec<ComponentInfo>,
    /// Keyword-matched commits
    #[serde(default)]
    pub commits: Vec<CommitInfo>,
    /// Documentation summaries
    #[serde(default)]
    pub documentation: Vec<DocInfo>,
    /// Class hierarchy: class name -> {inherits: [...], file: path}
    #[serde(default)]
    pub structure: serde_json::Map<String, Value>,
    /// Dependencies, categorized (frameworks, domain_libs, data, ...)
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl RepoAnalysis {
    /// Create an empty analysis for the given repository
    #[must_use]
    pub fn new(repo_kind: RepoKind, repo_path: impl Into<String>) -> Self {
        Self {
            repo_kind,
            repo_path: repo_path.into(),
            components: Vec::new(),
            commits: Vec::new(),
            documentation: Vec::new(),
            structure: serde_json::Map::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Load an analysis document from a JSON file
    ///
    /// # Errors
    /// - `PipelineError::Io` if the file cannot be read
    /// - `PipelineError::Serialization` if it does not decode
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repo_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&RepoKind::PythonLib).unwrap(),
            "\"python_lib\""
        );
        let back: RepoKind = serde_json::from_str("\"huggingface\"").unwrap();
        assert_eq!(back, RepoKind::Huggingface);
    }

    #[test]
    fn ml_kinds() {
        assert!(RepoKind::Huggingface.is_ml());
        assert!(RepoKind::Pytorch.is_ml());
        assert!(!RepoKind::Generic.is_ml());
    }

    #[test]
    fn component_bases_from_metadata() {
        let component: ComponentInfo = serde_json::from_value(serde_json::json!({
            "name": "BertModel",
            "path": "src/bert.py",
            "type": "class",
            "metadata": {"bases": ["PreTrainedModel"]},
        }))
        .unwrap();
        assert_eq!(component.bases(), vec!["PreTrainedModel"]);

        let bare: ComponentInfo = serde_json::from_value(serde_json::json!({
            "name": "helper",
            "path": "src/util.py",
            "type": "function",
        }))
        .unwrap();
        assert!(bare.bases().is_empty());
    }

    #[test]
    fn analysis_round_trip() {
        let mut analysis = RepoAnalysis::new(RepoKind::Huggingface, "/tmp/repo");
        analysis
            .dependencies
            .insert("frameworks".to_string(), vec!["torch".to_string()]);
        analysis.commits.push(CommitInfo {
            sha: "abc12345".to_string(),
            date: "2026-01-15".to_string(),
            message: "Add flash attention".to_string(),
            author: "dev".to_string(),
            tags: vec!["optimization".to_string()],
            metadata: Value::Null,
        });

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["repo_type"], "huggingface");
        let back: RepoAnalysis = serde_json::from_value(json).unwrap();
        assert_eq!(back, analysis);
    }

    #[test]
    fn analysis_tolerates_missing_sections() {
        let analysis: RepoAnalysis = serde_json::from_value(serde_json::json!({
            "repo_type": "generic",
            "repo_path": "/tmp/repo",
        }))
        .unwrap();
        assert!(analysis.components.is_empty());
        assert!(analysis.structure.is_empty());
    }
}
