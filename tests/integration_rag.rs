#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// End-to-end tests exercising extraction, splitting, embedding, and
/// retrieval through the public `RagEngine` API against a real on-disk
/// LanceDB store.
use rag_engine::config::{ChunkingConfig, Config, RetrievalConfig};
use rag_engine::pipeline::RagEngine;
use std::path::PathBuf;
use tempfile::TempDir;

async fn create_engine() -> (RagEngine, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        chunking: ChunkingConfig::default(),
        retrieval: RetrievalConfig::default(),
        base_dir: temp_dir.path().to_path_buf(),
    };
    let engine = RagEngine::new(config).await.expect("should create engine");
    (engine, temp_dir)
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("should write test file");
    path
}

#[tokio::test]
async fn ingest_then_retrieve_grounded_passages() {
    let (engine, temp_dir) = create_engine().await;

    let manual = write_file(
        &temp_dir,
        "manual.md",
        "# Configuration\n\nSet the chunk size in config.toml.\n\n\
         # Logging\n\nLogs are controlled through the RUST_LOG variable.",
    );
    let faq = write_file(
        &temp_dir,
        "faq.txt",
        "Q: How do I reset my password?\nA: Use the account settings page.",
    );

    let manual_summary = engine
        .ingest(&manual, "product_docs")
        .await
        .expect("should ingest manual");
    let faq_summary = engine
        .ingest(&faq, "product_docs")
        .await
        .expect("should ingest faq");

    assert!(manual_summary.chunk_count >= 1);
    assert!(faq_summary.chunk_count >= 1);
    assert_ne!(manual_summary.document_id, faq_summary.document_id);

    let results = engine
        .search("chunk size configuration", "product_docs", 3)
        .await
        .expect("should search");

    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    for result in &results {
        assert!(
            result.document_name == "manual.md" || result.document_name == "faq.txt",
            "unexpected document: {}",
            result.document_name
        );
    }
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[tokio::test]
async fn knowledge_bases_are_isolated() {
    let (engine, temp_dir) = create_engine().await;

    let rust_notes = write_file(&temp_dir, "rust.txt", "Ownership and borrowing in Rust.");
    let python_notes = write_file(&temp_dir, "python.txt", "List comprehensions in Python.");

    engine
        .ingest(&rust_notes, "kb_rust")
        .await
        .expect("should ingest rust notes");
    engine
        .ingest(&python_notes, "kb_python")
        .await
        .expect("should ingest python notes");

    let results = engine
        .search("ownership", "kb_rust", 5)
        .await
        .expect("should search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_name, "rust.txt");
}

#[tokio::test]
async fn retrieval_is_deterministic_for_identical_queries() {
    let (engine, temp_dir) = create_engine().await;

    let path = write_file(
        &temp_dir,
        "corpus.txt",
        "Alpha passage.\n\nBeta passage.\n\nGamma passage.",
    );
    engine.ingest(&path, "kb_det").await.expect("should ingest");

    let first = engine
        .search("beta passage", "kb_det", 3)
        .await
        .expect("first search");
    let second = engine
        .search("Beta Passage", "kb_det", 3)
        .await
        .expect("second search");

    // The hash embedding lowercases its input, so the two queries are the
    // same vector and must rank and score identically.
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.content, b.content);
        assert_eq!(a.similarity, b.similarity);
    }
}

#[tokio::test]
async fn store_survives_engine_restart() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        chunking: ChunkingConfig::default(),
        retrieval: RetrievalConfig::default(),
        base_dir: temp_dir.path().to_path_buf(),
    };

    let path = temp_dir.path().join("durable.txt");
    std::fs::write(&path, "Durable content outlives the process.").expect("should write");

    {
        let engine = RagEngine::new(config.clone())
            .await
            .expect("should create engine");
        engine
            .ingest(&path, "kb_durable")
            .await
            .expect("should ingest");
    }

    // A fresh engine over the same base dir sees the persisted chunks
    let engine = RagEngine::new(config).await.expect("should recreate engine");
    let results = engine
        .search("durable content", "kb_durable", 3)
        .await
        .expect("should search after restart");

    assert_eq!(results.len(), 1);
    assert!(results[0].content.contains("Durablecontentoutlivestheprocess."));
}
