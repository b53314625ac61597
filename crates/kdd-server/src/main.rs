mod cli;
mod mcp;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // MCP mode keeps stdout clean for JSON-RPC; logs always go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index(args) => cli::index::run(args, &cli.globals)?,
        Commands::Search(args) => cli::search::run(args, &cli.globals)?,
        Commands::Semantic(args) => cli::semantic::run(args, &cli.globals)?,
        Commands::Graph(args) => cli::graph::run(args, &cli.globals)?,
        Commands::Impact(args) => cli::impact::run(args, &cli.globals)?,
        Commands::Coverage(args) => cli::coverage::run(args, &cli.globals)?,
        Commands::Violations(args) => cli::violations::run(args, &cli.globals)?,
        Commands::Status => cli::status::run(&cli.globals)?,
        Commands::Mcp => mcp::run(&cli.globals).await?,
    }

    Ok(())
}
