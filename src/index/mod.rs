#[cfg(test)]
mod tests;

use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use itertools::Itertools;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::embeddings::ollama::EmbeddedChunk;
use crate::{LessonError, Result};

const TABLE_NAME: &str = "chunks";
const UPSERT_RETRY_ATTEMPTS: u32 = 3;
const UPSERT_BACKOFF_MS: u64 = 250;

/// Namespaced vector store backed by LanceDB.
///
/// All vectors share one fixed dimension and cosine similarity; namespaces
/// partition the table per ingested source and every query is scoped to
/// exactly one namespace.
pub struct VectorIndex {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// A single nearest-neighbor hit.
///
/// `score` is cosine similarity when returned by [`VectorIndex::query`] and
/// a fused rank score after reciprocal rank fusion; fused scores only order
/// hits within one fusion result.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub id: String,
    pub score: f32,
    pub text: Option<String>,
}

impl VectorIndex {
    /// Connect to the LanceDB database at `path`, creating it if needed
    #[inline]
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LessonError::Index(format!("failed to create index directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| LessonError::Index(format!("failed to connect to LanceDB: {}", e)))?;

        let index = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            dimension,
        };

        index.ensure_index().await?;

        info!("Vector index initialized at {:?}", path);
        Ok(index)
    }

    /// The fixed vector dimension this index accepts
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Idempotent creation of the backing table.
    ///
    /// Safe to call repeatedly and from concurrent pipeline runs; loses the
    /// creation race gracefully when another run created the table first.
    #[inline]
    pub async fn ensure_index(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| LessonError::Index(format!("failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            debug!("Table {} already exists", self.table_name);
            return Ok(());
        }

        let schema = create_schema(self.dimension);
        match self
            .connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
        {
            Ok(_) => {
                info!(
                    "Created table {} with dimension {}",
                    self.table_name, self.dimension
                );
                Ok(())
            }
            Err(e) => {
                // A concurrent run may have created it in the meantime
                let table_names = self
                    .connection
                    .table_names()
                    .execute()
                    .await
                    .map_err(|e| LessonError::Index(format!("failed to list tables: {}", e)))?;

                if table_names.contains(&self.table_name) {
                    debug!("Table {} created by a concurrent run", self.table_name);
                    Ok(())
                } else {
                    Err(LessonError::Index(format!("failed to create table: {}", e)))
                }
            }
        }
    }

    /// Upsert embedded chunks into `namespace` in bounded-size batches.
    ///
    /// Ids are deterministic, so existing rows with the same id are replaced
    /// rather than duplicated. Each batch is retried on failure; a batch
    /// that keeps failing aborts the upsert with the committed count, and
    /// the index stays consistent up to that batch.
    ///
    /// Returns the total number of vectors written.
    #[inline]
    pub async fn upsert(
        &self,
        namespace: &str,
        chunks: &[EmbeddedChunk],
        batch_size: usize,
    ) -> Result<usize> {
        if chunks.is_empty() {
            debug!("No chunks to upsert");
            return Ok(0);
        }

        if batch_size == 0 {
            return Err(LessonError::Index(
                "upsert batch size must be positive".to_string(),
            ));
        }

        for chunk in chunks {
            if chunk.vector.len() != self.dimension {
                return Err(LessonError::Index(format!(
                    "chunk {} has dimension {} but index expects {}",
                    chunk.id,
                    chunk.vector.len(),
                    self.dimension
                )));
            }
        }

        debug!(
            "Upserting {} chunks into namespace {} (batch size {})",
            chunks.len(),
            namespace,
            batch_size
        );

        let table = self.table().await?;
        let mut committed = 0;

        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            self.upsert_batch(&table, namespace, batch, committed)
                .await
                .map_err(|reason| LessonError::PartialUpsert {
                    committed,
                    batch: batch_index,
                    reason,
                })?;
            committed += batch.len();
        }

        info!(
            "Upserted {} vectors into namespace {}",
            committed, namespace
        );
        Ok(committed)
    }

    async fn upsert_batch(
        &self,
        table: &Table,
        namespace: &str,
        batch: &[EmbeddedChunk],
        offset: usize,
    ) -> std::result::Result<(), String> {
        let mut last_error = None;

        for attempt in 1..=UPSERT_RETRY_ATTEMPTS {
            match self.try_write_batch(table, namespace, batch, offset).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "Upsert batch failed (attempt {}/{}): {}",
                        attempt, UPSERT_RETRY_ATTEMPTS, e
                    );
                    last_error = Some(e);
                    if attempt < UPSERT_RETRY_ATTEMPTS {
                        sleep(Duration::from_millis(
                            UPSERT_BACKOFF_MS * u64::from(attempt),
                        ))
                        .await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| "batch write failed".to_string()))
    }

    async fn try_write_batch(
        &self,
        table: &Table,
        namespace: &str,
        batch: &[EmbeddedChunk],
        offset: usize,
    ) -> std::result::Result<(), String> {
        // Replace any rows carrying the same deterministic ids, then append.
        let id_list = batch
            .iter()
            .map(|c| format!("'{}'", escape_literal(&c.id)))
            .join(", ");
        table
            .delete(&format!("id IN ({})", id_list))
            .await
            .map_err(|e| format!("failed to clear existing ids: {}", e))?;

        let record_batch = build_record_batch(namespace, batch, offset, self.dimension)
            .map_err(|e| e.to_string())?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| format!("failed to insert batch: {}", e))?;

        Ok(())
    }

    /// Return up to `top_k` nearest neighbors by cosine similarity within
    /// `namespace` only.
    #[inline]
    pub async fn query(
        &self,
        vector: &[f32],
        namespace: &str,
        top_k: usize,
        include_text: bool,
    ) -> Result<Vec<RetrievalHit>> {
        if vector.len() != self.dimension {
            return Err(LessonError::Index(format!(
                "query vector has dimension {} but index expects {}",
                vector.len(),
                self.dimension
            )));
        }

        debug!(
            "Querying namespace {} for top {} neighbors",
            namespace, top_k
        );

        let table = self.table().await?;

        let results = table
            .vector_search(vector)
            .map_err(|e| LessonError::Index(format!("failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .only_if(format!("namespace = '{}'", escape_literal(namespace)))
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| LessonError::Index(format!("failed to execute search: {}", e)))?;

        self.parse_hits(results, include_text).await
    }

    async fn parse_hits(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
        include_text: bool,
    ) -> Result<Vec<RetrievalHit>> {
        let mut hits = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| LessonError::Index(format!("failed to read result stream: {}", e)))?
        {
            hits.extend(parse_hit_batch(&batch, include_text)?);
        }

        debug!("Parsed {} hits from result stream", hits.len());
        Ok(hits)
    }

    /// Delete all vectors in `namespace`.
    ///
    /// A namespace (or table) that does not exist counts as nothing to
    /// delete rather than an error.
    #[inline]
    pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| LessonError::Index(format!("failed to list tables: {}", e)))?;

        if !table_names.contains(&self.table_name) {
            debug!("Table {} missing, nothing to delete", self.table_name);
            return Ok(());
        }

        let table = self.table().await?;
        table
            .delete(&format!("namespace = '{}'", escape_literal(namespace)))
            .await
            .map_err(|e| LessonError::Index(format!("failed to delete namespace: {}", e)))?;

        info!("Deleted namespace {}", namespace);
        Ok(())
    }

    /// Total number of vectors stored across all namespaces
    #[inline]
    pub async fn count_rows(&self) -> Result<usize> {
        let table = self.table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| LessonError::Index(format!("failed to count rows: {}", e)))
    }

    /// Number of vectors stored in one namespace
    #[inline]
    pub async fn count_namespace(&self, namespace: &str) -> Result<usize> {
        let table = self.table().await?;
        table
            .count_rows(Some(format!(
                "namespace = '{}'",
                escape_literal(namespace)
            )))
            .await
            .map_err(|e| LessonError::Index(format!("failed to count namespace rows: {}", e)))
    }

    async fn table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| LessonError::Index(format!("failed to open table: {}", e)))
    }
}

fn create_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("namespace", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn build_record_batch(
    namespace: &str,
    chunks: &[EmbeddedChunk],
    offset: usize,
    dimension: usize,
) -> Result<RecordBatch> {
    let len = chunks.len();

    let mut ids = Vec::with_capacity(len);
    let mut texts = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * dimension);

    for (i, chunk) in chunks.iter().enumerate() {
        ids.push(chunk.id.as_str());
        texts.push(chunk.text.as_str());
        chunk_indices.push((offset + i) as u32);
        flat_values.extend_from_slice(&chunk.vector);
    }

    let created_at = chrono::Utc::now().to_rfc3339();
    let namespaces = vec![namespace; len];
    let created_ats = vec![created_at.as_str(); len];

    let values_array = Float32Array::from(flat_values);
    let item_field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(item_field, dimension as i32, Arc::new(values_array), None)
            .map_err(|e| LessonError::Index(format!("failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(namespaces)),
        Arc::new(StringArray::from(texts)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(create_schema(dimension), arrays)
        .map_err(|e| LessonError::Index(format!("failed to create record batch: {}", e)))
}

fn parse_hit_batch(batch: &RecordBatch, include_text: bool) -> Result<Vec<RetrievalHit>> {
    let ids = batch
        .column_by_name("id")
        .ok_or_else(|| LessonError::Index("missing id column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| LessonError::Index("invalid id column type".to_string()))?;

    let texts = if include_text {
        Some(
            batch
                .column_by_name("text")
                .ok_or_else(|| LessonError::Index("missing text column".to_string()))?
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| LessonError::Index("invalid text column type".to_string()))?,
        )
    } else {
        None
    };

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut hits = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        hits.push(RetrievalHit {
            id: ids.value(row).to_string(),
            // Cosine distance to similarity, higher is better
            score: 1.0 - distance,
            text: texts.map(|t| t.value(row).to_string()),
        });
    }

    Ok(hits)
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
