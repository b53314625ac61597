use crate::cli::{
    load_or_bail, open_container, parse_kinds, parse_layers, print_json, truncate, GlobalArgs,
    SearchArgs,
};
use kdd_core::query::HybridQueryInput;
use serde_json::json;

pub fn run(args: SearchArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let mut container = open_container(globals, !args.no_embeddings);
    load_or_bail(&mut container)?;

    let input = HybridQueryInput {
        query_text: args.query.clone(),
        expand_graph: !args.no_graph,
        depth: args.depth,
        include_kinds: parse_kinds(&args.kind)?,
        include_layers: parse_layers(&args.layer)?,
        respect_layers: true,
        min_score: args.min_score,
        limit: args.limit,
        max_tokens: 8000,
    };
    let result = container.query_engine().hybrid(&input)?;

    if args.format == "table" {
        for warning in &result.warnings {
            eprintln!("warning: {warning}");
        }
        println!("Found {} results:\n", result.total_results);
        for r in &result.results {
            let bar = "█".repeat((r.score * 10.0) as usize);
            println!("  {:.3} {} {}", r.score, bar, r.node_id);
            println!("        {}", truncate(&r.snippet, 70));
            println!("        source: {}\n", r.match_source);
        }
    } else {
        print_json(&json!({
            "total_results": result.total_results,
            "total_tokens": result.total_tokens,
            "warnings": result.warnings,
            "results": result.results,
        }))?;
    }
    Ok(())
}
