use crate::cli::{print_json, GlobalArgs, IndexArgs};
use anyhow::{bail, Context};
use kdd_core::{Container, ContainerOptions, IndexLevel};
use serde_json::json;

pub fn run(args: IndexArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let specs_path = args
        .specs_path
        .clone()
        .unwrap_or_else(|| globals.specs_path.clone());
    if !specs_path.is_dir() {
        bail!("specs path {} is not a directory", specs_path.display());
    }

    let enable_embeddings = match args.level.as_deref() {
        Some("L1") | Some("l1") => false,
        Some("L2") | Some("l2") | None => true,
        Some(other) => bail!("unsupported index level '{other}' (use L1 or L2)"),
    };

    let container = Container::open(
        &specs_path,
        ContainerOptions {
            index_path: Some(globals.index_path.clone()),
            enable_embeddings,
            default_domain: args.domain.clone(),
        },
    );
    if enable_embeddings && container.index_level == IndexLevel::L1 {
        eprintln!("warning: embedding model unavailable, indexing at L1");
    }

    let batch = container
        .indexer()
        .index_specs(&specs_path)
        .context("batch indexing failed")?;

    if args.format == "table" {
        println!(
            "Indexed: {}  Skipped: {}  Errors: {}  Deleted: {}",
            batch.indexed, batch.skipped, batch.errors, batch.deleted
        );
        for outcome in batch.outcomes.iter().filter(|o| !o.success) {
            println!(
                "  skipped {}: {}",
                outcome.source_path,
                outcome.skipped_reason.as_deref().unwrap_or("unknown")
            );
        }
        for outcome in batch.outcomes.iter().filter(|o| o.warning.is_some()) {
            println!("  warning: {}", outcome.warning.as_deref().unwrap_or(""));
        }
        println!("Index level: {}", container.index_level);
        println!("Index path: {}", container.index_path.display());
    } else {
        print_json(&json!({
            "indexed": batch.indexed,
            "skipped": batch.skipped,
            "errors": batch.errors,
            "deleted": batch.deleted,
            "index_level": container.index_level.to_string(),
            "index_path": container.index_path,
            "warnings": batch
                .outcomes
                .iter()
                .filter_map(|o| o.warning.clone())
                .collect::<Vec<_>>(),
        }))?;
    }

    Ok(())
}
