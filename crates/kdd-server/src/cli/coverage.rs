use crate::cli::{load_or_bail, open_container, print_json, CoverageArgs, GlobalArgs};
use serde_json::json;

pub fn run(args: CoverageArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let mut container = open_container(globals, false);
    load_or_bail(&mut container)?;

    let result = container.query_engine().coverage(&args.node)?;

    if args.format == "table" {
        println!("Coverage for {}: {:.1}%\n", result.node_id, result.coverage_percent);
        for category in &result.categories {
            let icon = if category.status == "covered" { "✓" } else { "✗" };
            println!("  {icon} {}: {}", category.name, category.status);
            for found in &category.found {
                println!("      → {found}");
            }
        }
    } else {
        print_json(&json!({
            "node_id": result.node_id,
            "kind": result.kind,
            "categories": result.categories,
            "coverage_percent": result.coverage_percent,
            "warnings": result.warnings,
        }))?;
    }
    Ok(())
}
