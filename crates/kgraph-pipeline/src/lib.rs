//! kgraph Pipeline - Graph extraction and expansion
//!
//! The two producers that mutate a knowledge graph from LLM responses:
//! - `ConceptExtractor`: analysis document -> initial graph, with a
//!   decide-retry-merge policy for sparse or truncated first passes
//! - `GraphExpander`: bounded BFS-style rounds that grow an existing
//!   graph until the backend runs dry or the round budget is spent
//!
//! Plus the collaborator interfaces the pipelines consume: the analysis
//! document model and the analyzer registry.

#![warn(unreachable_pub)]

pub mod analysis;
mod decode;
pub mod error;
pub mod expand;
pub mod extract;
mod prompts;
pub mod registry;

pub use analysis::{CommitInfo, ComponentInfo, DocInfo, RepoAnalysis, RepoKind};
pub use error::PipelineError;
pub use expand::{ExpanderConfig, ExpansionReport, GraphExpander};
pub use extract::{ConceptExtractor, ExtractorConfig};
pub use registry::{AnalyzerRegistry, GenericAnalyzer, RepoAnalyzer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
