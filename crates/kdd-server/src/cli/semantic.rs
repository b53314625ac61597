use crate::cli::{
    load_or_bail, open_container, parse_kinds, print_json, GlobalArgs, SemanticArgs,
};
use kdd_core::query::SemanticQueryInput;
use serde_json::json;

pub fn run(args: SemanticArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let mut container = open_container(globals, true);
    load_or_bail(&mut container)?;

    let input = SemanticQueryInput {
        query_text: args.query.clone(),
        include_kinds: parse_kinds(&args.kind)?,
        include_layers: None,
        min_score: args.min_score,
        limit: args.limit,
    };
    let result = container.query_engine().semantic(&input)?;

    if args.format == "table" {
        for warning in &result.warnings {
            eprintln!("warning: {warning}");
        }
        for r in &result.results {
            println!("  {:.3}  {}  {}", r.score, r.node_id, r.snippet);
        }
    } else {
        print_json(&json!({
            "total_results": result.total_results,
            "warnings": result.warnings,
            "results": result.results,
        }))?;
    }
    Ok(())
}
