//! On-disk artifact tree:
//!
//! ```text
//! <root>/
//!   manifest.json
//!   nodes/<kind>/<documentId>.json
//!   edges/edges.jsonl
//!   embeddings/<kind>/<documentId>.json
//! ```
//!
//! Nodes and embedding files are replaced in place; edges are append-only
//! JSONL. The writer is used from a single task at a time.

use crate::error::{KddError, Result};
use crate::types::{EmbeddingRecord, GraphEdge, GraphNode, KddKind, Manifest};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when a manifest is present.
    pub fn exists(&self) -> bool {
        self.manifest_path().is_file()
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    fn node_path(&self, kind: KddKind, document_id: &str) -> PathBuf {
        self.root
            .join("nodes")
            .join(kind.as_str())
            .join(format!("{document_id}.json"))
    }

    fn edges_path(&self) -> PathBuf {
        self.root.join("edges").join("edges.jsonl")
    }

    fn embeddings_path(&self, kind: KddKind, document_id: &str) -> PathBuf {
        self.root
            .join("embeddings")
            .join(kind.as_str())
            .join(format!("{document_id}.json"))
    }

    // === Writer ===

    pub fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        write_json(&self.manifest_path(), manifest)
    }

    /// Replace the node file for this node's `(kind, documentId)`.
    pub fn write_node(&self, node: &GraphNode) -> Result<()> {
        write_json(&self.node_path(node.kind, node.document_id()), node)
    }

    /// Append one line per edge, creating the file if absent.
    pub fn append_edges(&self, edges: &[GraphEdge]) -> Result<()> {
        if edges.is_empty() {
            return Ok(());
        }
        let path = self.edges_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        for edge in edges {
            let line = serde_json::to_string(edge)?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    /// Replace the embedding file for one `(kind, documentId)` group.
    pub fn write_embeddings(
        &self,
        kind: KddKind,
        document_id: &str,
        records: &[EmbeddingRecord],
    ) -> Result<()> {
        write_json(&self.embeddings_path(kind, document_id), &records)
    }

    /// Truncate the edge log.
    pub fn clear_edges(&self) -> Result<()> {
        let path = self.edges_path();
        if path.is_file() {
            fs::write(&path, "")?;
        }
        Ok(())
    }

    /// Delete the node file, the matching embedding file, and every edge
    /// line touching the deleted node.
    pub fn delete_document_artifacts(&self, document_id: &str) -> Result<()> {
        let mut node_id = None;
        for kind in KddKind::all() {
            let path = self.node_path(*kind, document_id);
            if path.is_file() {
                if let Ok(node) = read_json::<GraphNode>(&path) {
                    node_id = Some(node.id);
                }
                fs::remove_file(&path)?;
            }
            let embeddings = self.embeddings_path(*kind, document_id);
            if embeddings.is_file() {
                fs::remove_file(&embeddings)?;
            }
        }

        let Some(node_id) = node_id else {
            return Ok(());
        };
        debug!(node_id = %node_id, "pruning artifacts for deleted document");

        let edges_path = self.edges_path();
        if edges_path.is_file() {
            let kept: Vec<String> = fs::read_to_string(&edges_path)?
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter(|line| match serde_json::from_str::<GraphEdge>(line) {
                    Ok(edge) => edge.from != node_id && edge.to != node_id,
                    Err(_) => false,
                })
                .map(str::to_string)
                .collect();
            let mut contents = kept.join("\n");
            if !contents.is_empty() {
                contents.push('\n');
            }
            fs::write(&edges_path, contents)?;
        }
        Ok(())
    }

    // === Reader ===

    pub fn read_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some).map_err(|e| KddError::IndexUnavailable {
            path: self.root.clone(),
            reason: format!("manifest unreadable: {e}"),
        })
    }

    pub fn read_node(&self, kind: KddKind, document_id: &str) -> Result<Option<GraphNode>> {
        let path = self.node_path(kind, document_id);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// All persisted nodes, ordered by kind directory then file name.
    pub fn read_nodes(&self) -> Result<Vec<GraphNode>> {
        let mut nodes = Vec::new();
        for kind in KddKind::all() {
            let dir = self.root.join("nodes").join(kind.as_str());
            if !dir.is_dir() {
                continue;
            }
            let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            paths.sort();
            for path in paths {
                nodes.push(read_json(&path)?);
            }
        }
        Ok(nodes)
    }

    /// Every edge line; blank lines are skipped.
    pub fn read_edges(&self) -> Result<Vec<GraphEdge>> {
        let path = self.edges_path();
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let mut edges = Vec::new();
        for line in fs::read_to_string(&path)?.lines() {
            if line.trim().is_empty() {
                continue;
            }
            edges.push(serde_json::from_str(line)?);
        }
        Ok(edges)
    }

    /// Every embedding record across all `(kind, documentId)` groups.
    pub fn read_embeddings(&self) -> Result<Vec<EmbeddingRecord>> {
        let base = self.root.join("embeddings");
        let mut records = Vec::new();
        if !base.is_dir() {
            return Ok(records);
        }
        for kind in KddKind::all() {
            let dir = base.join(kind.as_str());
            if !dir.is_dir() {
                continue;
            }
            let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            paths.sort();
            for path in paths {
                let group: Vec<EmbeddingRecord> = read_json(&path)?;
                records.extend(group);
            }
        }
        Ok(records)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
