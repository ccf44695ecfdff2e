use lexgraph::config::AppConfig;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("LEXGRAPH_GRAPH__PROXIMITY_THRESHOLD");
        env::remove_var("LEXGRAPH_GRAPH__COMMUNITY_DETECTION");
        env::remove_var("LEXGRAPH_TAGGER__PROVIDER");
        env::remove_var("CONFIG_FILE");
        env::remove_var("GRAPH_DIR");
        env::remove_var("TAGGER_PROVIDER");
        env::remove_var("TAGGER_BASE_URL");
        env::remove_var("PROXIMITY_THRESHOLD");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["lexgraph"]).expect("defaults should load");
    assert_eq!(config.graph.proximity_threshold, 200);
    assert_eq!(config.graph.context_window, 50);
    assert!(config.graph.community_detection);
    assert_eq!(config.storage.graph_dir, PathBuf::from("uploads/knowledge_graphs"));
    assert!(config.storage.visualization);
    assert_eq!(config.tagger.provider, "pattern");
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("LEXGRAPH_GRAPH__PROXIMITY_THRESHOLD", "350");
        env::set_var("LEXGRAPH_GRAPH__COMMUNITY_DETECTION", "false");
    }

    let config = AppConfig::load_from_args(["lexgraph"]).expect("Failed to load config");
    assert_eq!(config.graph.proximity_threshold, 350);
    assert!(!config.graph.community_detection);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("lexgraph.yaml");
    fs::write(
        &file_path,
        r"
graph:
  proximity_threshold: 120
storage:
  graph_dir: /tmp/graphs
  visualization: false
",
    )
    .expect("Failed to write temp config");

    let path = file_path.to_string_lossy().to_string();
    let config = AppConfig::load_from_args(["lexgraph", "--config", path.as_str()])
        .expect("Failed to load config from file");
    assert_eq!(config.graph.proximity_threshold, 120);
    assert_eq!(config.storage.graph_dir, PathBuf::from("/tmp/graphs"));
    assert!(!config.storage.visualization);
    // untouched sections keep their defaults
    assert_eq!(config.tagger.max_entities, 500);
}

#[test]
#[serial]
fn test_missing_explicit_file_fails() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["lexgraph", "--config", "/nonexistent/lexgraph.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env_vars();
    unsafe {
        env::set_var("LEXGRAPH_GRAPH__PROXIMITY_THRESHOLD", "350");
        env::set_var("LEXGRAPH_TAGGER__PROVIDER", "external");
    }

    let config = AppConfig::load_from_args([
        "lexgraph",
        "--proximity-threshold",
        "80",
        "--tagger",
        "pattern",
        "--graph-dir",
        "/srv/graphs",
        "--no-visualization",
    ])
    .expect("Failed to load config");
    assert_eq!(config.graph.proximity_threshold, 80);
    assert_eq!(config.tagger.provider, "pattern");
    assert_eq!(config.storage.graph_dir, PathBuf::from("/srv/graphs"));
    assert!(!config.storage.visualization);

    clear_env_vars();
}
