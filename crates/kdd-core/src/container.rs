//! Container: assembles the stores from an artifact tree at startup.
//!
//! Encoder availability is auto-detected; a missing or failing model
//! degrades the session to L1 rather than erroring. A reindex builds new
//! store instances and swaps them wholesale; nothing mutates in place
//! while serving.

use crate::artifact::ArtifactStore;
use crate::error::{KddError, Result};
use crate::graph::GraphStore;
use crate::index::Indexer;
use crate::query::QueryEngine;
use crate::rules;
use crate::types::IndexLevel;
use crate::vector::{TextEncoder, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ContainerOptions {
    /// Index directory; defaults to `.kdd-index` next to the specs root.
    pub index_path: Option<PathBuf>,
    /// Attempt to load the embedding model.
    pub enable_embeddings: bool,
    pub default_domain: Option<String>,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            index_path: None,
            enable_embeddings: true,
            default_domain: None,
        }
    }
}

/// All wired dependencies for one session.
pub struct Container {
    pub specs_root: PathBuf,
    pub index_path: PathBuf,
    pub index_level: IndexLevel,
    pub artifacts: ArtifactStore,
    graph: Arc<GraphStore>,
    vector: Option<Arc<VectorStore>>,
    encoder: Option<Arc<dyn TextEncoder>>,
    default_domain: Option<String>,
    loaded: bool,
}

impl Container {
    /// Wire a container. Never fails: encoder problems degrade to L1.
    pub fn open(specs_root: impl Into<PathBuf>, options: ContainerOptions) -> Self {
        let specs_root = specs_root.into();
        let index_path = options.index_path.unwrap_or_else(|| {
            specs_root
                .parent()
                .unwrap_or(Path::new("."))
                .join(".kdd-index")
        });

        let encoder = if options.enable_embeddings {
            detect_encoder()
        } else {
            None
        };
        // the agent API is never auto-detected; L3 needs explicit wiring
        let index_level = rules::detect_index_level(encoder.is_some(), false);
        info!(level = %index_level, index_path = %index_path.display(), "container wired");

        Self {
            specs_root,
            artifacts: ArtifactStore::new(&index_path),
            index_path,
            index_level,
            graph: Arc::new(GraphStore::new()),
            vector: None,
            encoder,
            default_domain: options.default_domain,
            loaded: false,
        }
    }

    /// Load the stores from the artifact tree. Fails with
    /// `INDEX_UNAVAILABLE` when no manifest is present.
    pub fn load(&mut self) -> Result<()> {
        let manifest = self.artifacts.read_manifest()?.ok_or_else(|| {
            KddError::IndexUnavailable {
                path: self.index_path.clone(),
                reason: "no manifest found; run indexing first".to_string(),
            }
        })?;

        let nodes = self.artifacts.read_nodes()?;
        let edges = self.artifacts.read_edges()?;
        let mut graph = GraphStore::new();
        graph.load(nodes, edges);

        let embeddings = self.artifacts.read_embeddings()?;
        let vector = if embeddings.is_empty() {
            None
        } else {
            let mut store = VectorStore::new();
            store.load(&embeddings);
            Some(Arc::new(store))
        };

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            embeddings = embeddings.len(),
            manifest_level = %manifest.index_level,
            "index loaded"
        );

        self.graph = Arc::new(graph);
        self.vector = vector;
        self.loaded = true;
        Ok(())
    }

    /// Load unless already loaded; `false` when no index exists yet.
    pub fn ensure_loaded(&mut self) -> Result<bool> {
        if self.loaded {
            return Ok(true);
        }
        match self.load() {
            Ok(()) => Ok(true),
            Err(KddError::IndexUnavailable { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn graph_store(&self) -> Arc<GraphStore> {
        Arc::clone(&self.graph)
    }

    pub fn encoder(&self) -> Option<Arc<dyn TextEncoder>> {
        self.encoder.clone()
    }

    pub fn query_engine(&self) -> QueryEngine {
        QueryEngine::new(
            Arc::clone(&self.graph),
            self.vector.clone(),
            self.encoder.clone(),
        )
    }

    pub fn indexer(&self) -> Indexer {
        Indexer::new(
            self.artifacts.clone(),
            self.encoder.clone(),
            self.index_level,
        )
        .with_default_domain(self.default_domain.clone())
    }
}

#[cfg(feature = "embeddings")]
fn detect_encoder() -> Option<Arc<dyn TextEncoder>> {
    match crate::vector::FastEmbedEncoder::new() {
        Ok(encoder) => {
            info!(model = encoder.model_name(), "embedding model loaded");
            Some(Arc::new(encoder))
        }
        Err(e) => {
            warn!(error = %e, "embedding model unavailable, falling back to L1");
            None
        }
    }
}

#[cfg(not(feature = "embeddings"))]
fn detect_encoder() -> Option<Arc<dyn TextEncoder>> {
    info!("built without the embeddings feature, running at L1");
    None
}
