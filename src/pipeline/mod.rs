// Ingestion and retrieval pipelines
// Ties extraction, splitting, embedding, and the vector store together:
// `ingest` turns one document into an embedded chunk batch inside a
// knowledge-base collection, `search` retrieves the top-k passages for a
// query with similarity scores.


use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::embeddings::HashEmbedder;
use crate::splitter::RecursiveSplitter;
use crate::store::{ChunkRecord, VectorStore};
use crate::{RagError, Result};

/// Outcome of ingesting one document into a knowledge base.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub document_id: String,
    pub document_name: String,
    pub chunk_count: usize,
    pub elapsed_seconds: f64,
}

/// A retrieved passage, ranked by position in the result list.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub content: String,
    pub document_id: String,
    pub document_name: String,
    /// 1-indexed page number when the source format is paginated
    pub page: Option<u32>,
    /// `1 - distance/2`; depends on the backend metric and is deliberately
    /// not clamped to [0, 1]
    pub similarity: f32,
}

pub struct RagEngine {
    config: Config,
    store: VectorStore,
    splitter: RecursiveSplitter,
    embedder: HashEmbedder,
}

impl RagEngine {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let store = VectorStore::new(&config).await?;
        let splitter = RecursiveSplitter::new(&config.chunking);

        Ok(Self {
            config,
            store,
            splitter,
            embedder: HashEmbedder,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Ingest one document into a knowledge base: extract, split, embed,
    /// and add every chunk as one atomic batch.
    ///
    /// Each call assigns a fresh document id, so re-ingesting the same file
    /// produces a distinct, non-colliding chunk-id set.
    #[inline]
    pub async fn ingest(&self, path: &Path, knowledge_base_id: &str) -> Result<IngestSummary> {
        let start = Instant::now();

        let units = crate::extract::extract(path)?;
        let candidates = self.splitter.split_units(&units);
        debug!(
            "Extracted {} units, split into {} chunks for {}",
            units.len(),
            candidates.len(),
            path.display()
        );

        let document_id = Uuid::new_v4().to_string();
        let document_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts);

        let records: Vec<ChunkRecord> = candidates
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (candidate, vector))| ChunkRecord {
                id: format!("{}_chunk_{}", document_id, index),
                vector,
                content: candidate.text.clone(),
                document_id: document_id.clone(),
                document_name: document_name.clone(),
                chunk_index: index as u32,
                page: candidate.page,
            })
            .collect();

        self.store
            .add_chunks(knowledge_base_id, &records)
            .await
            .map_err(|e| {
                RagError::Storage(format!(
                    "Failed to store {} into knowledge base '{}': {}",
                    path.display(),
                    knowledge_base_id,
                    e
                ))
            })?;

        let summary = IngestSummary {
            document_id,
            document_name,
            chunk_count: records.len(),
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };

        info!(
            "Ingested {} as document {} ({} chunks in {:.2}s)",
            path.display(),
            summary.document_id,
            summary.chunk_count,
            summary.elapsed_seconds
        );
        Ok(summary)
    }

    /// Retrieve the top-k passages most similar to `query` from a knowledge
    /// base. Querying a knowledge base that does not exist yet returns an
    /// empty list, not an error.
    #[inline]
    pub async fn search(
        &self,
        query: &str,
        knowledge_base_id: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_vector = self.embedder.embed(query);

        let scored = self
            .store
            .query(knowledge_base_id, &query_vector, top_k)
            .await
            .map_err(|e| {
                RagError::Search(format!(
                    "query {:?} against knowledge base '{}': {}",
                    query, knowledge_base_id, e
                ))
            })?;

        let results = scored
            .into_iter()
            .map(|chunk| SearchResult {
                content: chunk.content,
                document_id: chunk.document_id,
                document_name: chunk.document_name,
                page: chunk.page,
                similarity: 1.0 - chunk.distance / 2.0,
            })
            .collect();

        Ok(results)
    }
}
