//! Analyzer registry
//!
//! Capability dispatch for repository analyzers: each handler reports
//! whether it can handle a repository and with what confidence, and the
//! registry picks the most confident one. Concrete per-type analyzers
//! live outside this crate; the built-in fallback only produces a bare
//! component listing so the pipeline always has something to work with.
//!
//! The registry is an explicitly constructed value with deterministic
//! registration order; there is no process-wide handler table.

use crate::analysis::{ComponentInfo, RepoAnalysis, RepoKind};
use crate::error::PipelineError;
use std::path::Path;

/// Confidence reported for the fallback handler.
const FALLBACK_CONFIDENCE: f32 = 0.1;

/// A repository analyzer handler
pub trait RepoAnalyzer: Send + Sync {
    /// Repository type this handler produces
    fn kind(&self) -> RepoKind;

    /// Confidence that this handler fits the repository, if it does at all
    fn can_handle(&self, repo: &Path) -> Option<f32>;

    /// Produce the analysis document
    ///
    /// # Errors
    /// - `PipelineError::Io` on filesystem failure
    fn analyze(&self, repo: &Path) -> Result<RepoAnalysis, PipelineError>;
}

/// Registry of analyzer handlers
///
/// Handlers are probed in registration order; the highest confidence
/// wins, earlier registration breaking ties.
pub struct AnalyzerRegistry {
    handlers: Vec<Box<dyn RepoAnalyzer>>,
    fallback: GenericAnalyzer,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerRegistry {
    /// Create an empty registry (fallback handler always present)
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            fallback: GenericAnalyzer,
        }
    }

    /// Register a handler
    pub fn register(&mut self, handler: Box<dyn RepoAnalyzer>) {
        tracing::debug!("Registered analyzer: {}", handler.kind());
        self.handlers.push(handler);
    }

    /// Number of registered handlers (excluding the fallback)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Pick the best handler for a repository
    ///
    /// Returns the handler with the highest `can_handle` confidence, or
    /// the generic fallback at a fixed low confidence if none matches.
    #[must_use]
    pub fn detect(&self, repo: &Path) -> (&dyn RepoAnalyzer, f32) {
        let mut best: Option<(&dyn RepoAnalyzer, f32)> = None;
        for handler in &self.handlers {
            if let Some(confidence) = handler.can_handle(repo) {
                tracing::debug!(
                    "{} can handle {} (confidence: {confidence:.2})",
                    handler.kind(),
                    repo.display()
                );
                if best.map_or(true, |(_, c)| confidence > c) {
                    best = Some((handler.as_ref(), confidence));
                }
            }
        }

        match best {
            Some((handler, confidence)) => {
                tracing::info!(
                    "Detected repository type: {} (confidence: {confidence:.2})",
                    handler.kind()
                );
                (handler, confidence)
            }
            None => {
                tracing::info!(
                    "No specific analyzer for {}, using generic fallback",
                    repo.display()
                );
                (&self.fallback, FALLBACK_CONFIDENCE)
            }
        }
    }
}

/// Fallback analyzer for repositories no registered handler claims
///
/// Produces a minimal analysis: top-level directories as packages and
/// top-level source files as modules. No structure, commits or docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericAnalyzer;

const SOURCE_EXTENSIONS: [&str; 8] = ["rs", "py", "js", "ts", "go", "java", "c", "cpp"];

impl RepoAnalyzer for GenericAnalyzer {
    fn kind(&self) -> RepoKind {
        RepoKind::Generic
    }

    fn can_handle(&self, _repo: &Path) -> Option<f32> {
        Some(FALLBACK_CONFIDENCE)
    }

    fn analyze(&self, repo: &Path) -> Result<RepoAnalysis, PipelineError> {
        let mut analysis = RepoAnalysis::new(RepoKind::Generic, repo.display().to_string());

        let mut entries: Vec<_> = std::fs::read_dir(repo)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .collect();
        entries.sort();

        for path in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let relative = name.to_string();
            if path.is_dir() {
                analysis.components.push(ComponentInfo {
                    name: relative.clone(),
                    path: relative,
                    kind: "package".to_string(),
                    metadata: serde_json::Value::Null,
                });
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
            {
                analysis.components.push(ComponentInfo {
                    name: relative.clone(),
                    path: relative,
                    kind: "module".to_string(),
                    metadata: serde_json::Value::Null,
                });
            }
        }

        tracing::info!(
            "Generic analysis of {}: {} components",
            repo.display(),
            analysis.components.len()
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAnalyzer {
        kind: RepoKind,
        confidence: Option<f32>,
    }

    impl RepoAnalyzer for FixedAnalyzer {
        fn kind(&self) -> RepoKind {
            self.kind
        }

        fn can_handle(&self, _repo: &Path) -> Option<f32> {
            self.confidence
        }

        fn analyze(&self, repo: &Path) -> Result<RepoAnalysis, PipelineError> {
            Ok(RepoAnalysis::new(self.kind, repo.display().to_string()))
        }
    }

    #[test]
    fn highest_confidence_wins() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Box::new(FixedAnalyzer {
            kind: RepoKind::PythonLib,
            confidence: Some(0.4),
        }));
        registry.register(Box::new(FixedAnalyzer {
            kind: RepoKind::Huggingface,
            confidence: Some(0.9),
        }));

        let (handler, confidence) = registry.detect(Path::new("/tmp/repo"));
        assert_eq!(handler.kind(), RepoKind::Huggingface);
        assert_eq!(confidence, 0.9);
    }

    #[test]
    fn tie_goes_to_earlier_registration() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Box::new(FixedAnalyzer {
            kind: RepoKind::PythonLib,
            confidence: Some(0.5),
        }));
        registry.register(Box::new(FixedAnalyzer {
            kind: RepoKind::Javascript,
            confidence: Some(0.5),
        }));

        let (handler, _) = registry.detect(Path::new("/tmp/repo"));
        assert_eq!(handler.kind(), RepoKind::PythonLib);
    }

    #[test]
    fn fallback_when_nothing_matches() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Box::new(FixedAnalyzer {
            kind: RepoKind::Pytorch,
            confidence: None,
        }));

        let (handler, confidence) = registry.detect(Path::new("/tmp/repo"));
        assert_eq!(handler.kind(), RepoKind::Generic);
        assert_eq!(confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn generic_analyzer_lists_components() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')").unwrap();
        std::fs::write(dir.path().join("README.md"), "# readme").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();

        let analysis = GenericAnalyzer.analyze(dir.path()).unwrap();
        let names: Vec<&str> = analysis.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["main.py", "src"]);
        assert_eq!(analysis.components[1].kind, "package");
    }
}
