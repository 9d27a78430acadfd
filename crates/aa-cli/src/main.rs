//! Attack Atlas CLI
//!
//! Entrypoint for the ATT&CK knowledge graph MCP server and its
//! maintenance commands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

mod config;

use aa_connectors::StixClient;
use aa_core::KnowledgeBase;
use aa_mcp::McpServer;
use aa_observability::init_logging_with_config;
use config::AppConfig;

#[derive(Parser)]
#[command(name = "attack-atlas")]
#[command(version)]
#[command(about = "MITRE ATT&CK knowledge graph served over MCP", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio
    Serve,

    /// Fetch the bundle, build the graph, and print statistics
    Fetch,

    /// Validate the configuration file and print the effective settings
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    init_logging_with_config(config.logging.to_observability());

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Fetch => fetch(config).await,
        Commands::Check => check(config),
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let kb = knowledge_base(&config)?;

    // Warm the graph so the first tool call is fast; a failure here is a
    // warning, not fatal, because the graph also builds lazily.
    if let Err(e) = kb.rebuild().await {
        tracing::warn!(error = %e, "Could not build graph on startup; will retry lazily");
    }

    let server = McpServer::new(kb, config.output_dir.clone(), config.bundle.domain.clone());
    server.run_stdio().await.context("MCP server failed")?;
    Ok(())
}

async fn fetch(config: AppConfig) -> Result<()> {
    let kb = knowledge_base(&config)?;
    kb.rebuild().await.context("Bundle fetch failed")?;

    let graph = kb.graph().await?;
    println!("{}", "Knowledge graph built".green().bold());
    println!("  nodes:   {}", graph.node_count());
    println!("  edges:   {}", graph.edge_count());
    println!("  version: {}", graph.version().unwrap_or("Unknown"));
    Ok(())
}

fn check(config: AppConfig) -> Result<()> {
    println!("{}", "Configuration OK".green().bold());
    println!("  bundle url: {}", config.bundle.url);
    println!("  domain:     {}", config.bundle.domain);
    println!(
        "  digest:     {}",
        match &config.bundle.expected_sha256 {
            Some(digest) => digest.clone(),
            None => format!("{}", "none (trust on first use)".yellow()),
        }
    );
    println!("  output dir: {}", config.output_dir.display());
    Ok(())
}

fn knowledge_base(config: &AppConfig) -> Result<Arc<KnowledgeBase>> {
    let client = StixClient::new(config.bundle.clone()).context("Failed to create STIX client")?;
    Ok(Arc::new(KnowledgeBase::new(Arc::new(client))))
}
