//! kgraph Core - Concept graph data model and store
//!
//! The central data structure of the pipeline:
//! - Typed concept nodes and directed relationship edges
//! - Identity and dedup (node ids are immutable once added)
//! - Prerequisite queries and cycle-tolerant topological ordering
//! - JSON snapshot serialization shared by every pipeline stage
//!
//! # Example
//!
//! ```rust
//! use kgraph_core::{ConceptLevel, ConceptNode, ConceptType, KnowledgeGraph};
//!
//! let mut kg = KnowledgeGraph::new();
//! kg.add_concept(ConceptNode::new(
//!     "attention_mechanism",
//!     "Attention Mechanism",
//!     ConceptType::Technique,
//!     ConceptLevel::Foundational,
//! ));
//! assert_eq!(kg.stats().num_concepts, 1);
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod graph;
pub mod types;

pub use error::GraphError;
pub use graph::{GraphStats, KnowledgeGraph};
pub use types::{ConceptLevel, ConceptNode, ConceptType, Edge, RelationshipType};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
