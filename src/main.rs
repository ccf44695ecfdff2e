//! lexgraph command line
//!
//! Builds, stores and prints legal knowledge graphs. Results go to stdout
//! as JSON; logs go to stderr.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use dotenvy::dotenv;
use lexgraph::config::{AppConfig, Cli, Command};
use lexgraph::domain::{ChatTurn, Document};
use lexgraph::graph::GraphStatistics;
use lexgraph::{KnowledgeGraphService, telemetry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Serialize)]
struct BuildOutput<'a> {
    graph_id: &'a str,
    name: &'a str,
    statistics: GraphStatistics,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (if present)
    let _ = dotenv();
    telemetry::init();

    let cli = Cli::parse();
    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = AppConfig::load_from_cli(&cli).context("Failed to load configuration")?;
    let service = KnowledgeGraphService::from_config(&config)?;

    match command {
        Command::Build { paths, name } => {
            let documents = collect_documents(&paths);
            info!(documents = documents.len(), "Building document graph");
            let graph = service.build_document_graph(documents, name).await?;
            print_build(&graph, config.graph.key_entity_limit)?;
        }
        Command::Chat {
            history,
            document_ids,
            name,
        } => {
            let turns = read_transcript(&history).await?;
            info!(turns = turns.len(), "Building chat graph");
            let ids = (!document_ids.is_empty()).then_some(document_ids);
            let graph = service.build_chat_graph(turns, ids, name).await?;
            print_build(&graph, config.graph.key_entity_limit)?;
        }
        Command::Show { id, simplified } => {
            let json = if simplified {
                serde_json::to_string_pretty(&service.get_simplified_graph(&id).await?)?
            } else {
                serde_json::to_string_pretty(&service.get_graph_record(&id).await?)?
            };
            println!("{json}");
        }
        Command::Visualization { id } => {
            let path = service.get_visualization(&id).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn print_build(graph: &lexgraph::domain::DocumentGraph, key_entity_limit: usize) -> Result<()> {
    let output = BuildOutput {
        graph_id: &graph.id,
        name: &graph.name,
        statistics: GraphStatistics::compute(graph, key_entity_limit),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Expand files and directories into documents, in a stable order. Ids are
/// derived from the path so rebuilding the same tree yields the same ids.
fn collect_documents(paths: &[PathBuf]) -> Vec<Document> {
    paths
        .iter()
        .flat_map(|root| {
            WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(e) if e.file_type().is_file() => Some(e.into_path()),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping unreadable path");
                        None
                    }
                })
        })
        .map(|path| {
            let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, path.to_string_lossy().as_bytes());
            Document::from_path(id.simple().to_string(), path)
        })
        .collect()
}

/// Transcripts are a JSON array of turns, or YAML when the extension says so.
async fn read_transcript(path: &Path) -> Result<Vec<ChatTurn>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    let turns = if is_yaml {
        serde_yaml::from_str(&raw).context("Invalid YAML transcript")?
    } else {
        serde_json::from_str(&raw).context("Invalid JSON transcript")?
    };
    Ok(turns)
}
