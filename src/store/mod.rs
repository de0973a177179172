// LanceDB-backed vector index
// One table per collection, named by the knowledge-base id. Stores chunk
// text and metadata alongside the embedding and serves nearest-neighbor
// queries ordered by ascending distance.


use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use tracing::{debug, info};

use crate::config::Config;
use crate::embeddings::EMBEDDING_DIM;
use crate::{RagError, Result};

/// A chunk ready to be inserted into a collection.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Unique within the collection; `{document_id}_chunk_{chunk_index}`
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: u32,
    /// 1-indexed page number for paginated source formats
    pub page: Option<u32>,
}

/// A stored chunk returned from a nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub content: String,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: u32,
    pub page: Option<u32>,
    /// Distance reported by the backend, ascending in result order
    pub distance: f32,
}

pub struct VectorStore {
    connection: Connection,
}

impl VectorStore {
    /// Open (or create) the vector database under the configured base dir.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Storage(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to connect to LanceDB: {}", e)))?;

        info!("Vector store initialized successfully");
        Ok(Self { connection })
    }

    /// Get the collection for a knowledge base, creating it if absent.
    /// Idempotent: a create racing another writer resolves to open.
    #[inline]
    pub async fn get_or_create_collection(&self, name: &str) -> Result<Table> {
        validate_collection_name(name)?;

        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to list collections: {}", e)))?;

        if table_names.iter().any(|existing| existing == name) {
            return self.open_collection(name).await;
        }

        debug!("Creating collection '{}'", name);
        match self
            .connection
            .create_empty_table(name, chunk_schema())
            .execute()
            .await
        {
            Ok(table) => Ok(table),
            // Lost a get-or-create race; the existing table wins
            Err(e) if e.to_string().to_lowercase().contains("already exists") => {
                self.open_collection(name).await
            }
            Err(e) => Err(RagError::Storage(format!(
                "Failed to create collection '{}': {}",
                name, e
            ))),
        }
    }

    async fn open_collection(&self, name: &str) -> Result<Table> {
        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to open collection '{}': {}", name, e)))
    }

    /// Add a batch of chunks to a collection as one atomic insert.
    ///
    /// Fails without writing anything if any id already exists in the
    /// collection.
    #[inline]
    pub async fn add_chunks(&self, collection: &str, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No chunks to store in '{}'", collection);
            return Ok(());
        }

        let table = self.get_or_create_collection(collection).await?;

        let existing = table
            .count_rows(Some(id_membership_predicate(records)))
            .await
            .map_err(|e| {
                RagError::Storage(format!("Failed to check for duplicate ids: {}", e))
            })?;
        if existing > 0 {
            return Err(RagError::Storage(format!(
                "{} duplicate chunk id(s) in collection '{}'",
                existing, collection
            )));
        }

        let record_batch = create_record_batch(records)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table.add(reader).execute().await.map_err(|e| {
            RagError::Storage(format!(
                "Failed to insert chunks into '{}': {}",
                collection, e
            ))
        })?;

        info!(
            "Stored {} chunks in collection '{}'",
            records.len(),
            collection
        );
        Ok(())
    }

    /// Return up to `top_k` nearest neighbors of `query_vector`, ordered by
    /// ascending distance. A `top_k` larger than the collection returns
    /// everything available.
    #[inline]
    pub async fn query(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        debug!(
            "Querying collection '{}' for {} nearest neighbors",
            collection, top_k
        );

        let table = self.get_or_create_collection(collection).await?;

        let mut results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Storage(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to execute search: {}", e)))?;

        let mut scored = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to read result stream: {}", e)))?
        {
            scored.extend(parse_search_batch(&batch)?);
        }

        debug!("Query returned {} chunks", scored.len());
        Ok(scored)
    }

    /// Number of chunks stored in a collection. Zero if it does not exist.
    #[inline]
    pub async fn count_chunks(&self, collection: &str) -> Result<u64> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to list collections: {}", e)))?;

        if !table_names.iter().any(|existing| existing == collection) {
            return Ok(0);
        }

        let table = self.open_collection(collection).await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Storage(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Names of all collections in the store.
    #[inline]
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to list collections: {}", e)))
    }

    /// Drop a collection and all of its chunks. Missing collections are
    /// ignored.
    #[inline]
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Storage(format!("Failed to list collections: {}", e)))?;

        if table_names.iter().any(|existing| existing == name) {
            info!("Dropping collection '{}'", name);
            self.connection.drop_table(name).await.map_err(|e| {
                RagError::Storage(format!("Failed to drop collection '{}': {}", name, e))
            })?;
        }

        Ok(())
    }
}

/// Collection names become directory names on disk, so restrict them to a
/// safe character set.
fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(RagError::Storage(format!(
            "Invalid collection name: '{}'",
            name
        )));
    }
    Ok(())
}

fn chunk_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                EMBEDDING_DIM as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("document_id", DataType::Utf8, false),
        Field::new("document_name", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("page", DataType::UInt32, true),
    ]))
}

/// SQL predicate matching any of the record ids, for the duplicate check.
fn id_membership_predicate(records: &[ChunkRecord]) -> String {
    let quoted: Vec<String> = records
        .iter()
        .map(|r| format!("'{}'", r.id.replace('\'', "''")))
        .collect();
    format!("id IN ({})", quoted.join(", "))
}

fn create_record_batch(records: &[ChunkRecord]) -> Result<RecordBatch> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut document_ids = Vec::with_capacity(len);
    let mut document_names = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut pages = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * EMBEDDING_DIM);

    for record in records {
        if record.vector.len() != EMBEDDING_DIM {
            return Err(RagError::Storage(format!(
                "Embedding for chunk '{}' has dimension {} (expected {})",
                record.id,
                record.vector.len(),
                EMBEDDING_DIM
            )));
        }
        ids.push(record.id.as_str());
        contents.push(record.content.as_str());
        document_ids.push(record.document_id.as_str());
        document_names.push(record.document_name.as_str());
        chunk_indices.push(record.chunk_index);
        pages.push(record.page);
        flat_values.extend_from_slice(&record.vector);
    }

    let values_array = Float32Array::from(flat_values);
    let item_field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(
        item_field,
        EMBEDDING_DIM as i32,
        Arc::new(values_array),
        None,
    )
    .map_err(|e| RagError::Storage(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(document_ids)),
        Arc::new(StringArray::from(document_names)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(UInt32Array::from(pages)),
    ];

    RecordBatch::try_new(chunk_schema(), arrays)
        .map_err(|e| RagError::Storage(format!("Failed to create record batch: {}", e)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
    let contents = string_column(batch, "content")?;
    let document_ids = string_column(batch, "document_id")?;
    let document_names = string_column(batch, "document_name")?;
    let chunk_indices = u32_column(batch, "chunk_index")?;
    let pages = u32_column(batch, "page")?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut scored = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        scored.push(ScoredChunk {
            content: contents.value(row).to_string(),
            document_id: document_ids.value(row).to_string(),
            document_name: document_names.value(row).to_string(),
            chunk_index: chunk_indices.value(row),
            page: if pages.is_null(row) {
                None
            } else {
                Some(pages.value(row))
            },
            distance,
        });
    }

    Ok(scored)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Storage(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Storage(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Storage(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Storage(format!("Invalid {} column type", name)))
}
