
use super::{DISTANCE_COLUMN, DOCUMENT_COLUMN, ID_COLUMN, VECTOR_COLUMN};
use crate::providers::{DocumentMatch, DocumentStore, Embedder, QueryResults, RankedMatches};
use crate::{QaError, config::Config};
use arrow::array::{Array, Float32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Document collection stored in LanceDB, searched by embedding similarity
pub struct VectorStore {
    connection: Connection,
    db_path: PathBuf,
    table_name: String,
    vector_dimension: usize,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    /// Open the document collection, creating an empty one if it is missing
    ///
    /// # Arguments
    /// * `config` - Application configuration containing the store location
    /// * `embedder` - Embeds query text before each search
    ///
    /// # Returns
    /// * `Result<Self, QaError>` - Opened store or error
    #[inline]
    pub async fn open(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self, QaError> {
        let db_path = config.vector_database_path();
        debug!("Opening LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            QaError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let mut store = Self::connect(config, db_path, embedder).await?;
        store.get_or_create_table().await?;

        info!(
            "Document collection '{}' ready at {:?} ({} dimensions)",
            store.table_name, store.db_path, store.vector_dimension
        );
        Ok(store)
    }

    /// Open the document collection only if it already exists
    ///
    /// Nothing is written to disk: a missing directory or table yields `None`.
    #[inline]
    pub async fn open_existing(
        config: &Config,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Option<Self>, QaError> {
        let db_path = config.vector_database_path();
        if !db_path.is_dir() {
            debug!("No vector database directory at {:?}", db_path);
            return Ok(None);
        }

        let mut store = Self::connect(config, db_path, embedder).await?;
        if !store.table_exists().await? {
            debug!("Collection '{}' does not exist yet", store.table_name);
            return Ok(None);
        }

        store.load_table_layout().await?;
        Ok(Some(store))
    }

    async fn connect(
        config: &Config,
        db_path: PathBuf,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, QaError> {
        let uri = format!("file://{}", absolute(&db_path)?.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            db_path,
            table_name: config.store.collection.clone(),
            vector_dimension: config.ollama.embedding_dimension as usize,
            embedder,
        })
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.table_name
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    async fn table_exists(&self) -> Result<bool, QaError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.contains(&self.table_name))
    }

    /// Adopt the vector dimension of an existing collection
    async fn load_table_layout(&mut self) -> Result<(), QaError> {
        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| QaError::Database(format!("Failed to get table schema: {}", e)))?;
        self.vector_dimension = Self::detect_vector_dimension(&schema)?;
        Self::check_document_column(&schema)
    }

    async fn get_or_create_table(&mut self) -> Result<(), QaError> {
        if self.table_exists().await? {
            debug!("Collection '{}' already exists", self.table_name);
            return self.load_table_layout().await;
        }

        info!(
            "Creating empty collection '{}' with {} dimensions",
            self.table_name, self.vector_dimension
        );

        self.connection
            .create_empty_table(
                &self.table_name,
                Self::collection_schema(self.vector_dimension),
            )
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    fn detect_vector_dimension(schema: &Schema) -> Result<usize, QaError> {
        for field in schema.fields() {
            if field.name() == VECTOR_COLUMN {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(QaError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn check_document_column(schema: &Schema) -> Result<(), QaError> {
        match schema.field_with_name(DOCUMENT_COLUMN) {
            Ok(field) if field.data_type() == &DataType::Utf8 => Ok(()),
            Ok(field) => Err(QaError::Database(format!(
                "Column '{}' has type {}, expected Utf8",
                DOCUMENT_COLUMN,
                field.data_type()
            ))),
            Err(_) => Err(QaError::Database(format!(
                "Missing {} column",
                DOCUMENT_COLUMN
            ))),
        }
    }

    /// Layout of a collection created by this store
    fn collection_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(ID_COLUMN, DataType::Utf8, false),
            Field::new(
                VECTOR_COLUMN,
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new(DOCUMENT_COLUMN, DataType::Utf8, false),
        ]))
    }

    // Opened per call so documents added by an external ingester show up.
    async fn open_table(&self) -> Result<Table, QaError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QaError::Database(format!("Failed to open table: {}", e)))
    }

    /// Get the total number of documents in the collection
    #[inline]
    pub async fn count_documents(&self) -> Result<u64, QaError> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| QaError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Search the collection for the nearest documents to each query text
    ///
    /// # Arguments
    /// * `query_texts` - Texts to embed and search for
    /// * `n_results` - Maximum number of matches per query text
    ///
    /// # Returns
    /// * `Result<QueryResults, QaError>` - One ranked list per query text
    #[inline]
    pub async fn search(
        &self,
        query_texts: &[String],
        n_results: usize,
    ) -> Result<QueryResults, QaError> {
        debug!(
            "Searching collection '{}' for {} queries with limit: {}",
            self.table_name,
            query_texts.len(),
            n_results
        );

        let table = self.open_table().await?;
        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| QaError::Database(format!("Failed to count rows: {}", e)))?;

        if rows == 0 || n_results == 0 {
            debug!("Nothing to search, returning empty matches");
            return Ok(QueryResults::new(vec![
                RankedMatches::default();
                query_texts.len()
            ]));
        }

        let embeddings = self.embedder.embed(query_texts).await?;
        let mut queries = Vec::with_capacity(embeddings.len());

        for embedding in &embeddings {
            if embedding.len() != self.vector_dimension {
                return Err(QaError::Database(format!(
                    "Query embedding has {} dimensions but collection '{}' expects {}",
                    embedding.len(),
                    self.table_name,
                    self.vector_dimension
                )));
            }

            let results = table
                .vector_search(embedding.as_slice())
                .map_err(|e| QaError::Database(format!("Failed to create vector search: {}", e)))?
                .column(VECTOR_COLUMN)
                .limit(n_results)
                .execute()
                .await
                .map_err(|e| QaError::Database(format!("Failed to execute search: {}", e)))?;

            queries.push(Self::collect_matches(results).await?);
        }

        Ok(QueryResults::new(queries))
    }

    /// Drain a LanceDB result stream into ranked matches
    async fn collect_matches(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<RankedMatches, QaError> {
        let mut matches = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| QaError::Database(format!("Failed to read result stream: {}", e)))?
        {
            matches.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Parsed {} matches from stream", matches.len());
        Ok(RankedMatches::new(matches))
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<DocumentMatch>, QaError> {
        let documents = batch
            .column_by_name(DOCUMENT_COLUMN)
            .ok_or_else(|| QaError::Database(format!("Missing {} column", DOCUMENT_COLUMN)))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                QaError::Database(format!("Invalid {} column type", DOCUMENT_COLUMN))
            })?;

        let distances = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let matches = (0..batch.num_rows())
            .map(|row| DocumentMatch {
                text: if documents.is_null(row) {
                    String::new()
                } else {
                    documents.value(row).to_string()
                },
                distance: distances
                    .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) }),
            })
            .collect();

        Ok(matches)
    }
}

#[async_trait]
impl DocumentStore for VectorStore {
    async fn query(&self, query_texts: &[String], n_results: usize) -> crate::Result<QueryResults> {
        self.search(query_texts, n_results).await
    }
}

fn absolute(path: &Path) -> Result<PathBuf, QaError> {
    std::path::absolute(path).map_err(|e| {
        QaError::Database(format!(
            "Failed to resolve vector database path {:?}: {}",
            path, e
        ))
    })
}
