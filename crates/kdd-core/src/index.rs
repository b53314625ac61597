//! Per-document indexing pipeline and the batch command over a specs tree.
//!
//! A single failing document never aborts the batch: it yields a skipped
//! outcome with a reason and the loop proceeds.

use crate::artifact::ArtifactStore;
use crate::chunker::{chunk_document, ChunkerConfig};
use crate::error::Result;
use crate::extract::ExtractorRegistry;
use crate::parser;
use crate::rules;
use crate::types::{
    Document, EmbeddingRecord, IndexLevel, IndexStats, KddKind, Layer, Manifest,
};
use crate::vector::TextEncoder;
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of indexing one document.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub source_path: String,
    pub success: bool,
    pub node_id: Option<String>,
    pub edge_count: usize,
    pub embedding_count: usize,
    pub skipped_reason: Option<String>,
    pub warning: Option<String>,
}

impl IndexOutcome {
    fn skipped(source_path: String, reason: impl Into<String>) -> Self {
        Self {
            source_path,
            success: false,
            node_id: None,
            edge_count: 0,
            embedding_count: 0,
            skipped_reason: Some(reason.into()),
            warning: None,
        }
    }
}

/// Aggregate result of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub outcomes: Vec<IndexOutcome>,
    pub indexed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub deleted: usize,
}

pub struct Indexer {
    registry: ExtractorRegistry,
    artifacts: ArtifactStore,
    encoder: Option<Arc<dyn TextEncoder>>,
    index_level: IndexLevel,
    chunker: ChunkerConfig,
    default_domain: Option<String>,
    git_commit: Option<String>,
}

impl Indexer {
    pub fn new(
        artifacts: ArtifactStore,
        encoder: Option<Arc<dyn TextEncoder>>,
        index_level: IndexLevel,
    ) -> Self {
        Self {
            registry: ExtractorRegistry::new(),
            artifacts,
            encoder,
            index_level,
            chunker: ChunkerConfig::default(),
            default_domain: None,
            git_commit: None,
        }
    }

    pub fn with_chunker(mut self, config: ChunkerConfig) -> Self {
        self.chunker = config;
        self
    }

    pub fn with_default_domain(mut self, domain: Option<String>) -> Self {
        self.default_domain = domain;
        self
    }

    pub fn with_git_commit(mut self, commit: Option<String>) -> Self {
        self.git_commit = commit;
        self
    }

    /// Index one source file: parse, route, extract, persist; then chunk
    /// and embed when the index level and encoder allow it.
    ///
    /// Only artifact-write failures surface as errors; everything else
    /// degrades to a skipped outcome.
    pub fn index_document(&self, path: &Path, specs_root: &Path) -> Result<IndexOutcome> {
        let source_path = relative_source_path(path, specs_root);

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(IndexOutcome::skipped(
                    source_path,
                    format!("unreadable file: {e}"),
                ))
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        let parsed = parser::parse(&content);

        let (kind, warning) = rules::route_kind(Some(&parsed.front_matter), &source_path);
        let Some(kind) = kind else {
            return Ok(IndexOutcome::skipped(
                source_path,
                "missing or unknown kind in front-matter",
            ));
        };
        if !self.registry.supports(kind) {
            return Ok(IndexOutcome::skipped(
                source_path,
                format!("no extractor for kind '{kind}'"),
            ));
        }

        let document_id = parsed
            .front_matter
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| file_stem(path));
        let source_hash = sha256_hex(&bytes);
        let layer = Layer::from_path(&source_path).unwrap_or(Layer::Domain);

        let doc = Document {
            document_id,
            source_path: source_path.clone(),
            source_hash,
            layer,
            links: parser::extract_links(&parsed.body),
            front_matter: parsed.front_matter,
            sections: parsed.sections,
        };

        let (mut node, edges) = self.registry.extract(kind, &doc);
        if node.domain.is_none() {
            node.domain = self.default_domain.clone();
        }

        self.artifacts.write_node(&node)?;
        self.artifacts.append_edges(&edges)?;

        let embedding_count = if self.index_level != IndexLevel::L1 {
            match &self.encoder {
                Some(encoder) => self.embed_document(&doc, kind, encoder.as_ref())?,
                None => 0,
            }
        } else {
            0
        };

        debug!(
            node_id = %node.id,
            edges = edges.len(),
            embeddings = embedding_count,
            "indexed document"
        );

        Ok(IndexOutcome {
            source_path,
            success: true,
            node_id: Some(node.id),
            edge_count: edges.len(),
            embedding_count,
            skipped_reason: None,
            warning,
        })
    }

    /// Chunk the document, encode all chunk contexts in one batch, and
    /// persist the records grouped by `(kind, documentId)`.
    fn embed_document(
        &self,
        doc: &Document,
        kind: KddKind,
        encoder: &dyn TextEncoder,
    ) -> Result<usize> {
        let chunks = chunk_document(doc, kind, &self.chunker);
        if chunks.is_empty() {
            return Ok(0);
        }

        let contexts: Vec<String> = chunks.iter().map(|c| c.context.clone()).collect();
        let vectors = encoder.encode(&contexts)?;
        if vectors.len() != chunks.len() {
            warn!(
                document_id = %doc.document_id,
                chunks = chunks.len(),
                vectors = vectors.len(),
                "encoder returned a mismatched batch; skipping embeddings"
            );
            return Ok(0);
        }

        let generated_at = Utc::now();
        let records: Vec<EmbeddingRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (chunk, vector))| EmbeddingRecord {
                id: chunk.id,
                document_id: chunk.document_id,
                kind,
                section_path: section_path_of(doc, &chunk.section),
                chunk_index: index,
                text_hash: sha256_hex(chunk.content.as_bytes()),
                text: chunk.content,
                context_text: chunk.context,
                dimensions: vector.len(),
                vector,
                model: encoder.model_name().to_string(),
                generated_at,
            })
            .collect();

        self.artifacts
            .write_embeddings(kind, &doc.document_id, &records)?;
        Ok(records.len())
    }

    /// Walk the specs tree and reindex every markdown file, pruning
    /// artifacts for documents that vanished from the source tree, then
    /// write a fresh manifest.
    pub fn index_specs(&self, specs_root: &Path) -> Result<BatchOutcome> {
        let mut files: Vec<_> = WalkDir::new(specs_root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort();

        // edges are replaced wholesale on reindexing
        self.artifacts.clear_edges()?;

        let mut outcomes = Vec::with_capacity(files.len());
        let mut indexed = 0usize;
        let mut skipped = 0usize;
        let mut errors = 0usize;
        let mut edge_total = 0usize;
        let mut embedding_total = 0usize;
        let mut seen_documents = BTreeSet::new();

        for file in &files {
            match self.index_document(file, specs_root) {
                Ok(outcome) => {
                    if outcome.success {
                        indexed += 1;
                        edge_total += outcome.edge_count;
                        embedding_total += outcome.embedding_count;
                        if let Some(node_id) = &outcome.node_id {
                            if let Some((_, document_id)) = node_id.split_once(':') {
                                seen_documents.insert(document_id.to_string());
                            }
                        }
                    } else {
                        skipped += 1;
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    errors += 1;
                    warn!(path = %file.display(), error = %e, "failed to index document");
                    outcomes.push(IndexOutcome::skipped(
                        relative_source_path(file, specs_root),
                        format!("indexing error: {e}"),
                    ));
                }
            }
        }

        // prune artifacts of documents no longer present in the source tree
        let mut deleted = 0usize;
        let mut domains = BTreeSet::new();
        for node in self.artifacts.read_nodes()? {
            if seen_documents.contains(node.document_id()) {
                if let Some(domain) = &node.domain {
                    domains.insert(domain.clone());
                }
            } else {
                self.artifacts.delete_document_artifacts(node.document_id())?;
                deleted += 1;
            }
        }

        let embeddings_enabled = self.index_level != IndexLevel::L1 && self.encoder.is_some();
        let manifest = Manifest {
            version: "1.0".to_string(),
            kdd_version: env!("CARGO_PKG_VERSION").to_string(),
            embedding_model: self
                .encoder
                .as_ref()
                .filter(|_| embeddings_enabled)
                .map(|e| e.model_name().to_string()),
            dimensions: self
                .encoder
                .as_ref()
                .filter(|_| embeddings_enabled)
                .map(|e| e.dimensions()),
            indexed_at: Utc::now(),
            indexed_by: format!("kdd-core/{}", env!("CARGO_PKG_VERSION")),
            structure: "standard".to_string(),
            index_level: self.index_level,
            stats: IndexStats {
                nodes: indexed,
                edges: edge_total,
                embeddings: embedding_total,
                enrichments: 0,
            },
            domains: domains.into_iter().collect(),
            git_commit: self.git_commit.clone(),
        };
        self.artifacts.write_manifest(&manifest)?;

        info!(
            indexed,
            skipped, errors, deleted, "batch indexing finished"
        );

        Ok(BatchOutcome {
            outcomes,
            indexed,
            skipped,
            errors,
            deleted,
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Source path relative to the parent of the specs root, so it keeps the
/// specs directory name (`specs/01-domain/...`).
fn relative_source_path(path: &Path, specs_root: &Path) -> String {
    let base = specs_root.parent().unwrap_or(specs_root);
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Dotted section path for a chunk's originating heading.
fn section_path_of(doc: &Document, heading: &str) -> String {
    doc.sections
        .iter()
        .find(|s| s.heading == heading)
        .map(|s| s.path.clone())
        .unwrap_or_else(|| parser::anchor_slug(heading))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::KddError;
    use std::fs;
    use tempfile::TempDir;

    /// Deterministic encoder: vector derived from text bytes.
    pub(crate) struct StubEncoder;

    impl TextEncoder for StubEncoder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 4];
                    for (i, b) in t.bytes().enumerate() {
                        v[i % 4] += f32::from(b) / 255.0;
                    }
                    v
                })
                .collect())
        }
        fn dimensions(&self) -> usize {
            4
        }
        fn model_name(&self) -> &str {
            "stub-model"
        }
    }

    /// Encoder that always fails, for degradation tests.
    struct FailingEncoder;

    impl TextEncoder for FailingEncoder {
        fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(KddError::Encoder("model unavailable".into()))
        }
        fn dimensions(&self) -> usize {
            4
        }
        fn model_name(&self) -> &str {
            "failing-model"
        }
    }

    fn write_spec(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn entity_md(id: &str) -> String {
        format!(
            "---\nkind: entity\nid: {id}\ntitle: {id}\n---\n## Description\nThe {id} aggregate, linked to [[EVT-001]].\n"
        )
    }

    #[test]
    fn indexes_a_document_end_to_end() {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        write_spec(&specs, "01-domain/entities/Pedido.md", &entity_md("Pedido"));

        let artifacts = ArtifactStore::new(dir.path().join(".kdd-index"));
        let indexer = Indexer::new(artifacts.clone(), None, IndexLevel::L1);
        let outcome = indexer
            .index_document(&specs.join("01-domain/entities/Pedido.md"), &specs)
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.node_id.as_deref(), Some("entity:Pedido"));
        assert_eq!(outcome.edge_count, 1);
        assert_eq!(outcome.embedding_count, 0);
        assert!(outcome.warning.is_none());

        let node = artifacts
            .read_node(KddKind::Entity, "Pedido")
            .unwrap()
            .unwrap();
        assert_eq!(node.source_path, "specs/01-domain/entities/Pedido.md");
        assert_eq!(node.source_hash.len(), 64);
    }

    #[test]
    fn source_hash_is_stable_across_runs() {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        write_spec(&specs, "01-domain/entities/Pedido.md", &entity_md("Pedido"));
        let artifacts = ArtifactStore::new(dir.path().join(".kdd-index"));
        let indexer = Indexer::new(artifacts.clone(), None, IndexLevel::L1);

        let path = specs.join("01-domain/entities/Pedido.md");
        indexer.index_document(&path, &specs).unwrap();
        let first = artifacts.read_node(KddKind::Entity, "Pedido").unwrap().unwrap();
        indexer.index_document(&path, &specs).unwrap();
        let second = artifacts.read_node(KddKind::Entity, "Pedido").unwrap().unwrap();

        assert_eq!(first.source_hash, second.source_hash);
        // replaced in place, not duplicated
        assert_eq!(artifacts.read_nodes().unwrap().len(), 1);
    }

    #[test]
    fn documents_without_kind_are_skipped() {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        write_spec(&specs, "01-domain/notes.md", "# Just notes\nno front matter\n");

        let artifacts = ArtifactStore::new(dir.path().join(".kdd-index"));
        let indexer = Indexer::new(artifacts, None, IndexLevel::L1);
        let outcome = indexer
            .index_document(&specs.join("01-domain/notes.md"), &specs)
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.skipped_reason.is_some());
    }

    #[test]
    fn misplaced_documents_carry_a_warning() {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        write_spec(&specs, "02-behavior/Stray.md", &entity_md("Stray"));

        let artifacts = ArtifactStore::new(dir.path().join(".kdd-index"));
        let indexer = Indexer::new(artifacts, None, IndexLevel::L1);
        let outcome = indexer
            .index_document(&specs.join("02-behavior/Stray.md"), &specs)
            .unwrap();
        assert!(outcome.success);
        assert_eq!(
            outcome.warning.as_deref(),
            Some("entity 'specs/02-behavior/Stray.md' found outside expected path '01-domain/entities/'")
        );
    }

    #[test]
    fn document_id_falls_back_to_file_stem() {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        write_spec(
            &specs,
            "01-domain/entities/Factura.md",
            "---\nkind: entity\n---\n## Description\nNo explicit id.\n",
        );
        let artifacts = ArtifactStore::new(dir.path().join(".kdd-index"));
        let indexer = Indexer::new(artifacts, None, IndexLevel::L1);
        let outcome = indexer
            .index_document(&specs.join("01-domain/entities/Factura.md"), &specs)
            .unwrap();
        assert_eq!(outcome.node_id.as_deref(), Some("entity:Factura"));
    }

    #[test]
    fn l2_indexing_writes_embeddings() {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        write_spec(&specs, "01-domain/entities/Pedido.md", &entity_md("Pedido"));

        let artifacts = ArtifactStore::new(dir.path().join(".kdd-index"));
        let indexer = Indexer::new(
            artifacts.clone(),
            Some(Arc::new(StubEncoder)),
            IndexLevel::L2,
        );
        let outcome = indexer
            .index_document(&specs.join("01-domain/entities/Pedido.md"), &specs)
            .unwrap();
        assert_eq!(outcome.embedding_count, 1);

        let records = artifacts.read_embeddings().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "Pedido:chunk-0");
        assert_eq!(records[0].dimensions, 4);
        assert_eq!(records[0].model, "stub-model");
        assert_eq!(records[0].text_hash.len(), 64);
        assert!(records[0].context_text.starts_with("Document: Pedido\n"));
    }

    #[test]
    fn batch_indexes_prunes_and_writes_manifest() {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        write_spec(&specs, "01-domain/entities/Pedido.md", &entity_md("Pedido"));
        write_spec(&specs, "01-domain/entities/Cliente.md", &entity_md("Cliente"));
        write_spec(&specs, "01-domain/scratch.md", "no front matter\n");

        let artifacts = ArtifactStore::new(dir.path().join(".kdd-index"));
        let indexer = Indexer::new(artifacts.clone(), None, IndexLevel::L1);
        let batch = indexer.index_specs(&specs).unwrap();
        assert_eq!(batch.indexed, 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.errors, 0);
        assert_eq!(batch.deleted, 0);

        let manifest = artifacts.read_manifest().unwrap().unwrap();
        assert_eq!(manifest.stats.nodes, 2);
        assert_eq!(manifest.index_level, IndexLevel::L1);
        assert!(manifest.embedding_model.is_none());

        // remove one source document; reindex prunes its artifacts
        fs::remove_file(specs.join("01-domain/entities/Cliente.md")).unwrap();
        let batch = indexer.index_specs(&specs).unwrap();
        assert_eq!(batch.indexed, 1);
        assert_eq!(batch.deleted, 1);
        assert_eq!(artifacts.read_nodes().unwrap().len(), 1);
    }

    #[test]
    fn encoder_failure_surfaces_as_error_not_panic() {
        let dir = TempDir::new().unwrap();
        let specs = dir.path().join("specs");
        write_spec(&specs, "01-domain/entities/Pedido.md", &entity_md("Pedido"));

        let artifacts = ArtifactStore::new(dir.path().join(".kdd-index"));
        let indexer = Indexer::new(
            artifacts,
            Some(Arc::new(FailingEncoder)),
            IndexLevel::L2,
        );
        let result = indexer.index_document(&specs.join("01-domain/entities/Pedido.md"), &specs);
        assert!(matches!(result, Err(KddError::Encoder(_))));

        // the batch keeps going regardless
        let dir2 = TempDir::new().unwrap();
        let specs2 = dir2.path().join("specs");
        write_spec(&specs2, "01-domain/entities/Pedido.md", &entity_md("Pedido"));
        let artifacts2 = ArtifactStore::new(dir2.path().join(".kdd-index"));
        let indexer2 = Indexer::new(
            artifacts2,
            Some(Arc::new(FailingEncoder)),
            IndexLevel::L2,
        );
        let batch = indexer2.index_specs(&specs2).unwrap();
        assert_eq!(batch.errors, 1);
        assert_eq!(batch.indexed, 0);
    }
}
