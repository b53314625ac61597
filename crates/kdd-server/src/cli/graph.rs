use crate::cli::{
    load_or_bail, open_container, parse_edge_types, parse_kinds, print_json, GlobalArgs, GraphArgs,
};
use kdd_core::query::GraphQueryInput;
use serde_json::json;

pub fn run(args: GraphArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let mut container = open_container(globals, false);
    load_or_bail(&mut container)?;

    let input = GraphQueryInput {
        root_node: args.root.clone(),
        depth: args.depth,
        edge_types: parse_edge_types(&args.edge_types)?,
        include_kinds: parse_kinds(&args.kind)?,
        respect_layers: !args.ignore_layers,
    };
    let result = container.query_engine().graph_query(&input)?;

    if args.format == "table" {
        println!("Center: {}", result.center_node.id);
        println!(
            "Related nodes: {}  Edges: {}\n",
            result.total_nodes, result.total_edges
        );
        for r in &result.related_nodes {
            println!("  {:.3}  {}  ({})", r.score, r.node_id, r.snippet);
        }
    } else {
        print_json(&json!({
            "center_node": result.center_node,
            "related_nodes": result.related_nodes,
            "edges": result.edges,
            "total_nodes": result.total_nodes,
            "total_edges": result.total_edges,
            "warnings": result.warnings,
        }))?;
    }
    Ok(())
}
