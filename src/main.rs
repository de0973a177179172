use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rag_engine::Result;
use rag_engine::config::Config;
use rag_engine::pipeline::RagEngine;

#[derive(Parser)]
#[command(name = "rag-engine")]
#[command(about = "Document chunking, vectorization, and similarity retrieval for knowledge bases")]
#[command(version)]
struct Cli {
    /// Override the data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document into a knowledge base
    Ingest {
        /// Path to the document (txt, csv, log, md, pdf, docx)
        file: PathBuf,
        /// Knowledge base id to ingest into
        #[arg(long)]
        kb: String,
    },
    /// Search a knowledge base for relevant passages
    Search {
        /// Query text
        query: String,
        /// Knowledge base id to search
        #[arg(long)]
        kb: String,
        /// Number of passages to retrieve
        #[arg(long)]
        top_k: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show chunk counts per knowledge base
    Status,
    /// Delete a knowledge base collection and all of its chunks
    Drop {
        /// Knowledge base id to delete
        kb: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.data_dir {
        Some(dir) => dir,
        None => Config::default_base_dir()?,
    };
    let config = Config::load(&base_dir)?;
    let engine = RagEngine::new(config).await?;

    match cli.command {
        Commands::Ingest { file, kb } => {
            let summary = engine.ingest(&file, &kb).await?;
            println!(
                "Ingested '{}' as document {} ({} chunks in {:.2}s)",
                summary.document_name,
                summary.document_id,
                summary.chunk_count,
                summary.elapsed_seconds
            );
        }
        Commands::Search {
            query,
            kb,
            top_k,
            json,
        } => {
            let top_k = top_k.unwrap_or(engine.config().retrieval.default_top_k);
            let results = engine.search(&query, &kb, top_k).await?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&results).map_err(anyhow::Error::from)?
                );
            } else if results.is_empty() {
                println!("No passages found in knowledge base '{}'", kb);
            } else {
                for (rank, result) in results.iter().enumerate() {
                    let page = result
                        .page
                        .map(|p| format!(", page {}", p))
                        .unwrap_or_default();
                    println!(
                        "{}. [{:.4}] {}{}",
                        rank + 1,
                        result.similarity,
                        result.document_name,
                        page
                    );
                    println!("   {}", result.content);
                }
            }
        }
        Commands::Status => {
            let store = engine.store();
            let collections = store.list_collections().await?;
            if collections.is_empty() {
                println!("No knowledge bases yet");
            } else {
                for name in collections {
                    let count = store.count_chunks(&name).await?;
                    println!("{}: {} chunks", name, count);
                }
            }
        }
        Commands::Drop { kb } => {
            engine.store().drop_collection(&kb).await?;
            println!("Dropped knowledge base '{}'", kb);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["rag-engine", "status"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from([
            "rag-engine",
            "search",
            "how do I configure logging",
            "--kb",
            "kb_1",
            "--top-k",
            "5",
        ]);
        assert!(matches!(
            cli.expect("should parse").command,
            Commands::Search { top_k: Some(5), .. }
        ));
    }

    #[test]
    fn ingest_requires_kb() {
        let cli = Cli::try_parse_from(["rag-engine", "ingest", "file.txt"]);
        assert!(cli.is_err());
    }
}
