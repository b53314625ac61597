pub mod artifact;
pub mod chunker;
pub mod container;
pub mod error;
pub mod extract;
pub mod graph;
pub mod index;
pub mod parser;
pub mod query;
pub mod rules;
pub mod types;
pub mod vector;

pub use artifact::ArtifactStore;
pub use chunker::{chunk_document, ChunkerConfig};
pub use container::{Container, ContainerOptions};
pub use error::{KddError, Result};
pub use extract::ExtractorRegistry;
pub use graph::{GraphStore, Traversal};
pub use index::{BatchOutcome, IndexOutcome, Indexer};
pub use query::{
    CoverageQueryResult, GraphQueryInput, GraphQueryResult, HybridQueryInput, HybridQueryResult,
    ImpactQueryInput, ImpactQueryResult, MatchSource, QueryEngine, SemanticQueryInput,
    SemanticQueryResult, ViolationsQueryInput, ViolationsQueryResult,
};
pub use types::*;
pub use vector::{TextEncoder, VectorStore};

#[cfg(feature = "embeddings")]
pub use vector::FastEmbedEncoder;
