//! Tool server: exposes the index as named tools over stdio.
//!
//! Wire format is JSON-RPC 2.0, one request per stdin line, one response
//! per stdout line. Notifications are consumed without a reply. All
//! logging goes through tracing, which `main` pins to stderr so stdout
//! stays pure protocol.

use crate::cli::GlobalArgs;
use anyhow::Result;
use kdd_core::query::{
    GraphQueryInput, HybridQueryInput, ImpactQueryInput, ViolationsQueryInput,
};
use kdd_core::{parser, Container, ContainerOptions, KddKind};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing::{info, warn};

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INTERNAL_ERROR: i64 = -32603;

/// The subset of a JSON-RPC request this server cares about. A missing
/// `id` marks a notification.
#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: String,
    #[serde(default)]
    params: Value,
}

pub async fn run(globals: &GlobalArgs) -> Result<()> {
    let mut container = Container::open(
        &globals.specs_path,
        ContainerOptions {
            index_path: Some(globals.index_path.clone()),
            enable_embeddings: true,
            default_domain: None,
        },
    );
    if !container.ensure_loaded()? {
        warn!(
            index_path = %globals.index_path.display(),
            "serving without an index; run 'kdd index' to populate it"
        );
    }
    info!(
        index_path = %globals.index_path.display(),
        "kdd tool server accepting requests on stdio"
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut output = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let Some(reply) = handle_line(&container, line.trim()) else {
            continue;
        };
        output.write_all(reply.to_string().as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    info!("input stream ended, tool server stopping");
    Ok(())
}

/// Turn one input line into at most one response value.
fn handle_line(container: &Container, line: &str) -> Option<Value> {
    if line.is_empty() {
        return None;
    }

    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "discarding malformed request line");
            return Some(failure(Value::Null, PARSE_ERROR, format!("invalid request: {e}")));
        }
    };

    // notifications carry no id and expect no reply
    let id = request.id?;

    Some(match handle_method(container, &request.method, &request.params) {
        Ok(payload) => success(id, payload),
        Err((code, message)) => {
            warn!(method = %request.method, message = %message, "request failed");
            failure(id, code, message)
        }
    })
}

fn success(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn failure(id: Value, code: i64, message: String) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

type MethodResult = std::result::Result<Value, (i64, String)>;

fn handle_method(container: &Container, method: &str, params: &Value) -> MethodResult {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": "kdd",
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "KDD exposes a typed knowledge graph over a specification \
                repository. Use kdd_search for hybrid retrieval, kdd_find_spec to \
                resolve one document, kdd_related to explore the neighborhood of a \
                node, kdd_impact before changing a spec, kdd_read_section to pull \
                source text, kdd_list to enumerate documents and kdd_stats for \
                index health."
        })),

        "ping" => Ok(json!({})),

        "tools/list" => Ok(tools_schema()),

        "tools/call" => {
            let name = params["name"].as_str().unwrap_or_default();
            let args = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default()));
            let payload = call_tool(container, name, &args)
                .map_err(|e| (INTERNAL_ERROR, e.to_string()))?;
            let text = serde_json::to_string_pretty(&payload)
                .map_err(|e| (INTERNAL_ERROR, e.to_string()))?;
            Ok(json!({"content": [{"type": "text", "text": text}]}))
        }

        other => Err((METHOD_NOT_FOUND, format!("no such method: {other}"))),
    }
}

fn call_tool(container: &Container, name: &str, args: &Value) -> Result<Value> {
    let engine = container.query_engine();
    match name {
        "kdd_search" => {
            let mut input =
                HybridQueryInput::new(args["query"].as_str().unwrap_or("").to_string());
            if let Some(limit) = args["limit"].as_u64() {
                input.limit = limit as usize;
            }
            if let Some(min_score) = args["min_score"].as_f64() {
                input.min_score = min_score;
            }
            input.include_kinds = kinds_from(args);
            let result = engine.hybrid(&input)?;
            Ok(json!({
                "total_results": result.total_results,
                "warnings": result.warnings,
                "results": result.results,
            }))
        }

        "kdd_find_spec" => {
            let query = args["id"].as_str().or(args["query"].as_str()).unwrap_or("");
            let graph = container.graph_store();
            if let Some(node) = graph.get_node(query) {
                return Ok(serde_json::to_value(node)?);
            }
            // fall back to resolving a bare document ID through kind prefixes
            for kind in KddKind::all() {
                if let Some(node) = graph.get_node(&kind.node_id(query)) {
                    return Ok(serde_json::to_value(node)?);
                }
            }
            let matches: Vec<Value> = graph
                .text_search(query, None)
                .into_iter()
                .take(5)
                .map(|node| json!({"id": node.id, "kind": node.kind, "title": node.title()}))
                .collect();
            Ok(json!({"exact": null, "candidates": matches}))
        }

        "kdd_related" => {
            let mut input =
                GraphQueryInput::new(args["node_id"].as_str().unwrap_or("").to_string());
            if let Some(depth) = args["depth"].as_u64() {
                input.depth = depth as usize;
            }
            let result = engine.graph_query(&input)?;
            Ok(json!({
                "center_node": result.center_node.id,
                "related_nodes": result.related_nodes,
                "total_nodes": result.total_nodes,
                "total_edges": result.total_edges,
            }))
        }

        "kdd_impact" => {
            let mut input =
                ImpactQueryInput::new(args["node_id"].as_str().unwrap_or("").to_string());
            if let Some(depth) = args["depth"].as_u64() {
                input.depth = depth as usize;
            }
            let result = engine.impact(&input)?;
            Ok(serde_json::to_value(&result)?)
        }

        "kdd_read_section" => read_section(container, args),

        "kdd_list" => {
            let kind_filter = args["kind"].as_str().and_then(KddKind::parse);
            let graph = container.graph_store();
            let nodes: Vec<Value> = graph
                .all_nodes()
                .filter(|node| kind_filter.map_or(true, |k| node.kind == k))
                .map(|node| {
                    json!({
                        "id": node.id,
                        "kind": node.kind,
                        "title": node.title(),
                        "status": node.status,
                        "layer": node.layer,
                    })
                })
                .collect();
            Ok(json!({"total": nodes.len(), "nodes": nodes}))
        }

        "kdd_stats" => {
            let manifest = container.artifacts.read_manifest()?;
            let graph = container.graph_store();
            let violations = engine.violations(&ViolationsQueryInput::default())?;
            Ok(json!({
                "manifest": manifest,
                "loaded_nodes": graph.node_count(),
                "loaded_edges": graph.edge_count(),
                "layer_violations": violations.total_violations,
            }))
        }

        _ => anyhow::bail!("unknown tool '{name}'"),
    }
}

/// Resolve a node and return one section of its source document (or the
/// whole body when no section is named).
fn read_section(container: &Container, args: &Value) -> Result<Value> {
    let node_id = args["node_id"].as_str().unwrap_or("");
    let graph = container.graph_store();
    let node = graph
        .get_node(node_id)
        .ok_or_else(|| anyhow::anyhow!("node not found: {node_id}"))?;

    let base = container
        .specs_root
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let source = base.join(&node.source_path);
    let content = std::fs::read_to_string(&source)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", source.display()))?;
    let parsed = parser::parse(&content);

    match args["section"].as_str() {
        Some(wanted) => {
            let wanted_lower = wanted.trim().to_lowercase();
            let section = parsed
                .sections
                .iter()
                .find(|s| {
                    s.heading.trim().to_lowercase() == wanted_lower || s.path == wanted_lower
                })
                .ok_or_else(|| anyhow::anyhow!("section '{wanted}' not found in {node_id}"))?;
            Ok(json!({
                "node_id": node.id,
                "section": section.heading,
                "path": section.path,
                "content": section.body,
            }))
        }
        None => Ok(json!({
            "node_id": node.id,
            "source_path": node.source_path,
            "content": parsed.body,
        })),
    }
}

fn kinds_from(args: &Value) -> Option<Vec<KddKind>> {
    let list = args["kinds"].as_array()?;
    let kinds: Vec<KddKind> = list
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(KddKind::parse)
        .collect();
    (!kinds.is_empty()).then_some(kinds)
}

fn tools_schema() -> Value {
    json!({
        "tools": [
            {
                "name": "kdd_search",
                "description": "Hybrid search over the specification graph: semantic + lexical + graph expansion.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Free-text query (min 3 chars)"},
                        "limit": {"type": "integer", "description": "Max results (default 10)"},
                        "min_score": {"type": "number", "description": "Score threshold (default 0.5)"},
                        "kinds": {"type": "array", "items": {"type": "string"}, "description": "Kind filter"}
                    },
                    "required": ["query"]
                }
            },
            {
                "name": "kdd_find_spec",
                "description": "Resolve one specification document by node ID or document ID.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string", "description": "Node ID (entity:Pedido) or bare document ID"}
                    },
                    "required": ["id"]
                }
            },
            {
                "name": "kdd_related",
                "description": "Explore the graph neighborhood of a node.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "node_id": {"type": "string"},
                        "depth": {"type": "integer", "description": "Traversal depth (default 2)"}
                    },
                    "required": ["node_id"]
                }
            },
            {
                "name": "kdd_impact",
                "description": "What breaks if this node changes: direct and transitive dependents plus BDD scenarios to re-run.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "node_id": {"type": "string"},
                        "depth": {"type": "integer", "description": "Analysis depth (default 3)"}
                    },
                    "required": ["node_id"]
                }
            },
            {
                "name": "kdd_read_section",
                "description": "Read a section (or the whole body) of a document's source file.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "node_id": {"type": "string"},
                        "section": {"type": "string", "description": "Heading or dotted section path"}
                    },
                    "required": ["node_id"]
                }
            },
            {
                "name": "kdd_list",
                "description": "List indexed documents, optionally filtered by kind.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "kind": {"type": "string"}
                    }
                }
            },
            {
                "name": "kdd_stats",
                "description": "Index manifest, loaded store sizes and layer-violation count.",
                "inputSchema": {"type": "object", "properties": {}}
            }
        ]
    })
}
