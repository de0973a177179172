use super::*;
use tempfile::TempDir;

#[test]
fn defaults_when_config_file_missing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.chunking.chunk_size, 500);
    assert_eq!(config.chunking.chunk_overlap, 50);
    assert_eq!(config.retrieval.default_top_k, 3);
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
fn load_partial_config_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[chunking]\nchunk_size = 800\n",
    )
    .expect("should write config");

    let config = Config::load(temp_dir.path()).expect("should load config");

    assert_eq!(config.chunking.chunk_size, 800);
    // Unspecified fields fall back to defaults
    assert_eq!(config.chunking.chunk_overlap, 50);
    assert_eq!(config.retrieval.default_top_k, 3);
}

#[test]
fn save_and_reload_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        chunking: ChunkingConfig {
            chunk_size: 1000,
            chunk_overlap: 100,
        },
        retrieval: RetrievalConfig { default_top_k: 5 },
        base_dir: temp_dir.path().to_path_buf(),
    };

    config.save().expect("should save config");
    let reloaded = Config::load(temp_dir.path()).expect("should reload config");

    assert_eq!(reloaded, config);
}

#[test]
fn rejects_invalid_chunk_size() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        chunking: ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 2,
        },
        retrieval: RetrievalConfig::default(),
        base_dir: temp_dir.path().to_path_buf(),
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidChunkSize(10))
    ));
}

#[test]
fn rejects_overlap_not_smaller_than_chunk_size() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        chunking: ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        },
        retrieval: RetrievalConfig::default(),
        base_dir: temp_dir.path().to_path_buf(),
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidChunkOverlap(100, 100))
    ));
}

#[test]
fn vector_database_path_under_base_dir() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(
        config.vector_database_path(),
        temp_dir.path().join("vectors")
    );
}
