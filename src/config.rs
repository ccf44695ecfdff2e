use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Directory holding persisted graphs
    #[arg(long, env = "GRAPH_DIR", global = true)]
    pub graph_dir: Option<PathBuf>,

    /// Entity tagger provider (pattern | external)
    #[arg(long, env = "TAGGER_PROVIDER", global = true)]
    pub tagger: Option<String>,

    /// Base URL of the external NLP service
    #[arg(long, env = "TAGGER_BASE_URL", global = true)]
    pub tagger_url: Option<String>,

    /// Maximum byte distance for proximity relationships
    #[arg(long, env = "PROXIMITY_THRESHOLD", global = true)]
    pub proximity_threshold: Option<usize>,

    /// Skip rendering the HTML visualization
    #[arg(long, global = true)]
    pub no_visualization: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a graph from text files or directories of text files
    Build {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Graph name (defaults to a timestamped name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Build a graph from a chat transcript (JSON or YAML array of turns)
    Chat {
        /// Path to the transcript
        history: PathBuf,
        /// Documents referenced during the conversation
        #[arg(long = "document-id")]
        document_ids: Vec<String>,
        /// Graph name (defaults to a timestamped name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a stored graph
    Show {
        id: String,
        /// Print the simplified projection instead of the full record
        #[arg(long)]
        simplified: bool,
    },
    /// Print the path of a graph's rendered visualization
    Visualization { id: String },
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tagger: TaggerConfig,
}

/// Tunables for graph construction.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GraphConfig {
    /// Byte distance under which two mentions are considered near
    pub proximity_threshold: usize,
    /// Bytes kept on each side of a mention as its context
    pub context_window: usize,
    /// Run community detection; off means every node lands in community 0
    pub community_detection: bool,
    /// Compute betweenness; off leaves the 0.5 "uncomputed" default
    pub centrality: bool,
    /// Modularity resolution (higher = smaller communities)
    pub resolution: f64,
    /// Iteration cap for community detection
    pub max_iterations: usize,
    /// Number of key entities reported in statistics
    pub key_entity_limit: usize,
    /// Label length in the simplified projection
    pub simplified_label_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 200,
            context_window: 50,
            community_detection: true,
            centrality: true,
            resolution: 1.0,
            max_iterations: 100,
            key_entity_limit: 10,
            simplified_label_limit: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub graph_dir: PathBuf,
    pub visualization: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            graph_dir: PathBuf::from("uploads/knowledge_graphs"),
            visualization: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TaggerConfig {
    pub provider: String,
    pub base_url: Option<String>,
    pub min_confidence: f32,
    pub max_entities: usize,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            provider: "pattern".to_string(),
            base_url: None,
            min_confidence: 0.0,
            max_entities: 500,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::load_from_cli(&cli)
    }

    /// Resolve configuration.
    ///
    /// Priority: CLI flag > CLI env var > `LEXGRAPH_` env > config file > defaults.
    pub fn load_from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        // 1. Config file: explicit path must exist, ./config.* is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 2. Environment variables prefixed with LEXGRAPH_
        // E.g. LEXGRAPH_GRAPH__PROXIMITY_THRESHOLD=300
        builder = builder.add_source(
            Environment::with_prefix("LEXGRAPH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 3. CLI overrides (clap already folded in their env vars)
        if let Some(dir) = &cli.graph_dir {
            builder = builder.set_override("storage.graph_dir", dir.to_string_lossy().as_ref())?;
        }
        if let Some(provider) = &cli.tagger {
            builder = builder.set_override("tagger.provider", provider.as_str())?;
        }
        if let Some(url) = &cli.tagger_url {
            builder = builder.set_override("tagger.base_url", url.as_str())?;
        }
        if let Some(threshold) = cli.proximity_threshold {
            builder = builder.set_override("graph.proximity_threshold", threshold as u64)?;
        }
        if cli.no_visualization {
            builder = builder.set_override("storage.visualization", false)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "lexgraph",
            "build",
            "a.txt",
            "docs/",
            "--name",
            "appeal",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Build { paths, name }) => {
                assert_eq!(paths.len(), 2);
                assert_eq!(name.as_deref(), Some("appeal"));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "lexgraph",
            "chat",
            "history.json",
            "--document-id",
            "d1",
            "--document-id",
            "d2",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Chat { document_ids, .. }) => assert_eq!(document_ids, ["d1", "d2"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let graph = GraphConfig::default();
        assert_eq!(graph.proximity_threshold, 200);
        assert_eq!(graph.simplified_label_limit, 20);
        assert_eq!(TaggerConfig::default().provider, "pattern");
    }
}
