pub mod coverage;
pub mod graph;
pub mod impact;
pub mod index;
pub mod search;
pub mod semantic;
pub mod status;
pub mod violations;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use kdd_core::{Container, ContainerOptions, EdgeType, KddKind, Layer};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kdd")]
#[command(version, about = "Knowledge-graph index and retrieval for KDD specification repositories")]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Index directory
    #[arg(long, global = true, env = "KDD_INDEX_PATH", default_value = ".kdd-index")]
    pub index_path: PathBuf,

    /// Specs directory
    #[arg(long, global = true, env = "KDD_SPECS_PATH", default_value = "specs")]
    pub specs_path: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a specs tree into the artifact directory
    Index(IndexArgs),
    /// Hybrid search: semantic + lexical + graph
    Search(SearchArgs),
    /// Pure semantic search
    Semantic(SemanticArgs),
    /// Traverse the graph from a root node
    Graph(GraphArgs),
    /// Analyze the impact of changing a node
    Impact(ImpactArgs),
    /// Governance coverage for a node
    Coverage(CoverageArgs),
    /// List layer dependency violations
    Violations(ViolationsArgs),
    /// Show index status and statistics
    Status,
    /// Serve the index as tools over stdio (JSON-RPC 2.0)
    Mcp,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Specs tree to index; defaults to the global --specs-path
    pub specs_path: Option<PathBuf>,

    /// Domain tag applied to documents without one
    #[arg(long)]
    pub domain: Option<String>,

    /// Force an index level (L1 skips embeddings)
    #[arg(long)]
    pub level: Option<String>,

    /// Output format: json (default), table
    #[arg(long, default_value = "json")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    /// Max results
    #[arg(short = 'n', long = "n", default_value = "10")]
    pub limit: usize,

    #[arg(long, default_value = "0.5")]
    pub min_score: f64,

    /// Graph expansion depth
    #[arg(long, default_value = "2")]
    pub depth: usize,

    /// Disable graph expansion
    #[arg(long)]
    pub no_graph: bool,

    /// Filter by kind (repeatable)
    #[arg(long)]
    pub kind: Vec<String>,

    /// Filter by layer (repeatable)
    #[arg(long)]
    pub layer: Vec<String>,

    /// Skip the embedding model entirely
    #[arg(long)]
    pub no_embeddings: bool,

    #[arg(long, default_value = "json")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct SemanticArgs {
    pub query: String,

    #[arg(short = 'n', long = "n", default_value = "10")]
    pub limit: usize,

    #[arg(long, default_value = "0.7")]
    pub min_score: f64,

    #[arg(long)]
    pub kind: Vec<String>,

    #[arg(long, default_value = "json")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    pub root: String,

    #[arg(short, long, default_value = "2")]
    pub depth: usize,

    /// Filter edge types (repeatable)
    #[arg(long = "edge-type")]
    pub edge_types: Vec<String>,

    #[arg(long)]
    pub kind: Vec<String>,

    /// Follow layer-violating edges too
    #[arg(long)]
    pub ignore_layers: bool,

    #[arg(long, default_value = "json")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct ImpactArgs {
    pub node: String,

    #[arg(short, long, default_value = "3")]
    pub depth: usize,

    #[arg(long, default_value = "json")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct CoverageArgs {
    pub node: String,

    #[arg(long, default_value = "json")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct ViolationsArgs {
    #[arg(long)]
    pub kind: Vec<String>,

    #[arg(long)]
    pub layer: Vec<String>,

    #[arg(long, default_value = "json")]
    pub format: String,
}

/// Wire a container from the global arguments.
pub fn open_container(globals: &GlobalArgs, enable_embeddings: bool) -> Container {
    Container::open(
        &globals.specs_path,
        ContainerOptions {
            index_path: Some(globals.index_path.clone()),
            enable_embeddings,
            default_domain: None,
        },
    )
}

/// Load the index or fail with a actionable message.
pub fn load_or_bail(container: &mut Container) -> anyhow::Result<()> {
    if !container.ensure_loaded()? {
        bail!(
            "no index found at {}; run 'kdd index' first",
            container.index_path.display()
        );
    }
    Ok(())
}

pub fn parse_kinds(raw: &[String]) -> anyhow::Result<Option<Vec<KddKind>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.iter()
        .map(|value| {
            KddKind::parse(value).with_context(|| format!("unknown kind '{value}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .map(Some)
}

pub fn parse_layers(raw: &[String]) -> anyhow::Result<Option<Vec<Layer>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.iter()
        .map(|value| parse_layer(value).with_context(|| format!("unknown layer '{value}'")))
        .collect::<anyhow::Result<Vec<_>>>()
        .map(Some)
}

fn parse_layer(value: &str) -> Option<Layer> {
    match value.trim().to_lowercase().as_str() {
        "requirements" => Some(Layer::Requirements),
        "domain" => Some(Layer::Domain),
        "behavior" => Some(Layer::Behavior),
        "experience" => Some(Layer::Experience),
        "verification" => Some(Layer::Verification),
        _ => None,
    }
}

pub fn parse_edge_types(raw: &[String]) -> anyhow::Result<Option<Vec<EdgeType>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.iter()
        .map(|value| value.parse::<EdgeType>().map_err(anyhow::Error::msg))
        .collect::<anyhow::Result<Vec<_>>>()
        .map(Some)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
