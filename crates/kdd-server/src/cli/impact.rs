use crate::cli::{load_or_bail, open_container, print_json, GlobalArgs, ImpactArgs};
use kdd_core::query::ImpactQueryInput;
use serde_json::json;

pub fn run(args: ImpactArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let mut container = open_container(globals, false);
    load_or_bail(&mut container)?;

    let mut input = ImpactQueryInput::new(&args.node);
    input.depth = args.depth;
    let result = container.query_engine().impact(&input)?;

    if args.format == "table" {
        println!("Impact analysis for: {}\n", result.node_id);
        println!("Directly affected: {}", result.total_directly);
        for a in &result.directly_affected {
            println!("  {} [{}] — {}", a.node_id, a.edge_type, a.impact_description);
        }
        if !result.transitively_affected.is_empty() {
            println!("\nTransitively affected: {}", result.total_transitively);
            for t in &result.transitively_affected {
                println!("  {} via {}", t.node_id, t.path.join(" → "));
            }
        }
        if !result.scenarios_to_rerun.is_empty() {
            println!("\nBDD scenarios to re-run: {}", result.scenarios_to_rerun.len());
            for s in &result.scenarios_to_rerun {
                println!("  {} — {}", s.scenario_name, s.reason);
            }
        }
    } else {
        print_json(&json!({
            "node_id": result.node_id,
            "change_type": result.change_type,
            "directly_affected": result.directly_affected,
            "transitively_affected": result.transitively_affected,
            "scenarios_to_rerun": result.scenarios_to_rerun,
            "total_directly": result.total_directly,
            "total_transitively": result.total_transitively,
            "warnings": result.warnings,
        }))?;
    }
    Ok(())
}
