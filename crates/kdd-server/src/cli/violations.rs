use crate::cli::{
    load_or_bail, open_container, parse_kinds, parse_layers, print_json, GlobalArgs,
    ViolationsArgs,
};
use kdd_core::query::ViolationsQueryInput;
use serde_json::json;

pub fn run(args: ViolationsArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let mut container = open_container(globals, false);
    load_or_bail(&mut container)?;

    let input = ViolationsQueryInput {
        include_kinds: parse_kinds(&args.kind)?,
        include_layers: parse_layers(&args.layer)?,
    };
    let result = container.query_engine().violations(&input)?;

    if args.format == "table" {
        println!("Total edges: {}", result.total_edges_analyzed);
        println!(
            "Violations: {} ({:.2}%)\n",
            result.total_violations, result.violation_rate
        );
        for v in &result.violations {
            println!(
                "  {} ({}) → {} ({}) [{}]",
                v.from, v.from_layer, v.to, v.to_layer, v.edge_type
            );
        }
    } else {
        print_json(&json!({
            "violations": result.violations,
            "total_violations": result.total_violations,
            "total_edges_analyzed": result.total_edges_analyzed,
            "violation_rate": result.violation_rate,
            "warnings": result.warnings,
        }))?;
    }
    Ok(())
}
