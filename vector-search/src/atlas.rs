//! MongoDB Atlas vector search.
//!
//! Runs a two-stage aggregation: `$vectorSearch` finds the nearest stored
//! embeddings, `$project` keeps the display fields and injects the
//! relevance score.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document as BsonDocument, doc};
use mongodb::{Client, Collection};
use tracing::{debug, info};

use crate::document::{Document, SearchResult, rank_results};
use crate::error::{Result, VectorSearchError};
use crate::store::{VectorSearchQuery, VectorStore};

/// Field the relevance score is projected into.
pub const SCORE_FIELD: &str = "score";

/// Default per-aggregation deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A `database.collection` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Database name.
    pub database: String,

    /// Collection name.
    pub collection: String,
}

impl FromStr for Namespace {
    type Err = VectorSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((database, collection)) if !database.is_empty() && !collection.is_empty() => {
                Ok(Self {
                    database: database.to_string(),
                    collection: collection.to_string(),
                })
            }
            _ => Err(VectorSearchError::Config(format!(
                "namespace must look like database.collection, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Vector search backed by an Atlas collection.
pub struct AtlasVectorStore {
    /// Target collection.
    collection: Collection<BsonDocument>,

    /// Namespace, for logging.
    namespace: Namespace,

    /// Field holding the document text.
    text_key: String,

    /// Field holding the document title.
    title_key: String,

    /// Additional fields to return as metadata.
    extra_fields: Vec<String>,

    /// Per-aggregation deadline.
    timeout: Duration,
}

impl AtlasVectorStore {
    /// Connect to the cluster and bind to `namespace`.
    pub async fn connect(connection_string: &str, namespace: &str) -> Result<Self> {
        let namespace: Namespace = namespace.parse()?;
        let client = tokio::time::timeout(DEFAULT_TIMEOUT, Client::with_uri_str(connection_string))
            .await
            .map_err(|_| VectorSearchError::Timeout(DEFAULT_TIMEOUT))??;

        info!("Connected to Atlas namespace {namespace}");
        Ok(Self::from_client(&client, namespace))
    }

    /// Bind to `namespace` using an existing client.
    pub fn from_client(client: &Client, namespace: Namespace) -> Self {
        let collection = client
            .database(&namespace.database)
            .collection::<BsonDocument>(&namespace.collection);

        Self {
            collection,
            namespace,
            text_key: "text".to_string(),
            title_key: "title".to_string(),
            extra_fields: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the field holding the document text.
    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    /// Set the field holding the document title.
    pub fn with_title_key(mut self, key: impl Into<String>) -> Self {
        self.title_key = key.into();
        self
    }

    /// Also return `field` in each result's metadata.
    pub fn with_extra_field(mut self, field: impl Into<String>) -> Self {
        self.extra_fields.push(field.into());
        self
    }

    /// Set the per-aggregation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The bound namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Build the aggregation pipeline for a query.
    pub fn pipeline(
        &self,
        query_vector: &[f32],
        query: &VectorSearchQuery,
    ) -> Result<Vec<BsonDocument>> {
        let vector: Vec<Bson> = query_vector
            .iter()
            .map(|v| Bson::Double(f64::from(*v)))
            .collect();

        let num_candidates = count_to_bson(query.num_candidates)?;
        let limit = count_to_bson(query.limit)?;

        let mut search = doc! {
            "index": query.index.as_str(),
            "path": query.path.as_str(),
            "queryVector": vector,
            "numCandidates": num_candidates,
            "limit": limit,
        };
        if let Some(filter) = &query.filter {
            let filter = bson::to_document(filter).map_err(|e| {
                VectorSearchError::InvalidQuery(format!("filter is not a document: {e}"))
            })?;
            search.insert("filter", filter);
        }

        let mut project = doc! { "_id": 0 };
        project.insert(self.text_key.as_str(), 1);
        project.insert(self.title_key.as_str(), 1);
        for field in &self.extra_fields {
            project.insert(field.as_str(), 1);
        }
        project.insert(SCORE_FIELD, doc! { "$meta": "vectorSearchScore" });

        Ok(vec![
            doc! { "$vectorSearch": search },
            doc! { "$project": project },
        ])
    }

    /// Turn one projected result into a document and its score.
    pub fn parse_result(&self, mut raw: BsonDocument) -> Result<(Document, f64)> {
        let score = match raw.remove(SCORE_FIELD) {
            Some(Bson::Double(score)) => score,
            Some(Bson::Int32(score)) => f64::from(score),
            Some(Bson::Int64(score)) => score as f64,
            other => {
                return Err(VectorSearchError::InvalidResponse(format!(
                    "result has no numeric {SCORE_FIELD} field: {other:?}"
                )));
            }
        };

        let text = match raw.remove(&self.text_key) {
            Some(Bson::String(text)) => text,
            _ => String::new(),
        };
        let title = match raw.remove(&self.title_key) {
            Some(Bson::String(title)) => Some(title),
            _ => None,
        };
        let metadata = raw
            .into_iter()
            .map(|(key, value)| (key, value.into_relaxed_extjson()))
            .collect();

        Ok((
            Document {
                text,
                title,
                metadata,
            },
            score,
        ))
    }

    async fn aggregate(&self, pipeline: Vec<BsonDocument>) -> Result<Vec<BsonDocument>> {
        let mut cursor = self.collection.aggregate(pipeline).await?;
        let mut raw = Vec::new();
        while cursor.advance().await? {
            raw.push(cursor.deserialize_current()?);
        }
        Ok(raw)
    }
}

fn count_to_bson(value: usize) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| VectorSearchError::InvalidQuery(format!("{value} is out of range")))
}

#[async_trait]
impl VectorStore for AtlasVectorStore {
    fn name(&self) -> &str {
        "atlas"
    }

    async fn vector_search(
        &self,
        query_vector: &[f32],
        query: &VectorSearchQuery,
    ) -> Result<Vec<SearchResult>> {
        query.validate(query_vector)?;
        let pipeline = self.pipeline(query_vector, query)?;

        debug!(
            "Running $vectorSearch on {} (index {}, {} candidates, limit {})",
            self.namespace, query.index, query.num_candidates, query.limit
        );

        let raw = tokio::time::timeout(self.timeout, self.aggregate(pipeline))
            .await
            .map_err(|_| VectorSearchError::Timeout(self.timeout))??;

        let scored = raw
            .into_iter()
            .map(|doc| self.parse_result(doc))
            .collect::<Result<Vec<_>>>()?;
        let results = rank_results(scored, query.limit);

        info!("Atlas returned {} results", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // The driver parses the URI without contacting the server.
    async fn store() -> AtlasVectorStore {
        let client = Client::with_uri_str("mongodb://localhost:27017").await.unwrap();
        AtlasVectorStore::from_client(&client, "sample_mflix.embedded_movies".parse().unwrap())
            .with_text_key("plot")
    }

    #[test]
    fn test_namespace_parse() {
        let ns: Namespace = "sample_mflix.embedded_movies".parse().unwrap();
        assert_eq!(ns.database, "sample_mflix");
        assert_eq!(ns.collection, "embedded_movies");
        assert_eq!(ns.to_string(), "sample_mflix.embedded_movies");
        assert!("no_dot".parse::<Namespace>().is_err());
        assert!(".coll".parse::<Namespace>().is_err());
    }

    #[tokio::test]
    async fn test_pipeline_shape() {
        let store = store().await;
        let query = VectorSearchQuery::new("vector_index", "plot_embedding_voyage_3_large")
            .with_num_candidates(150)
            .with_limit(10)
            .with_filter(json!({"year": {"$gte": 1990}}));

        let pipeline = store.pipeline(&[0.5, -0.25], &query).unwrap();
        assert_eq!(pipeline.len(), 2);

        let search = pipeline[0].get_document("$vectorSearch").unwrap();
        assert_eq!(search.get_str("index").unwrap(), "vector_index");
        assert_eq!(
            search.get_str("path").unwrap(),
            "plot_embedding_voyage_3_large"
        );
        assert_eq!(search.get_i64("numCandidates").unwrap(), 150);
        assert_eq!(search.get_i64("limit").unwrap(), 10);
        assert_eq!(search.get_array("queryVector").unwrap().len(), 2);
        assert!(search.get_document("filter").is_ok());

        let project = pipeline[1].get_document("$project").unwrap();
        assert_eq!(project.get_i32("_id").unwrap(), 0);
        assert_eq!(project.get_i32("plot").unwrap(), 1);
        assert_eq!(project.get_i32("title").unwrap(), 1);
        assert_eq!(
            project
                .get_document("score")
                .unwrap()
                .get_str("$meta")
                .unwrap(),
            "vectorSearchScore"
        );
    }

    #[tokio::test]
    async fn test_parse_result() {
        let store = store().await.with_extra_field("year");
        let (document, score) = store
            .parse_result(doc! {
                "plot": "A crew travels through a wormhole.",
                "title": "Interstellar",
                "year": 2014,
                "score": 0.8123,
            })
            .unwrap();

        assert_eq!(document.text, "A crew travels through a wormhole.");
        assert_eq!(document.title.as_deref(), Some("Interstellar"));
        assert_eq!(document.metadata.get("year"), Some(&json!(2014)));
        assert!((score - 0.8123).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_parse_result_requires_score() {
        let store = store().await;
        let err = store.parse_result(doc! { "plot": "x" }).unwrap_err();
        assert!(matches!(err, VectorSearchError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_invalid_query_rejected_before_network() {
        let store = store().await;
        let query = VectorSearchQuery::new("vector_index", "emb")
            .with_num_candidates(5)
            .with_limit(10);
        let err = store.vector_search(&[1.0], &query).await.unwrap_err();
        assert!(matches!(err, VectorSearchError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_slow_aggregation_times_out() {
        // Unroutable address: server selection would wait far past the deadline.
        let client = Client::with_uri_str(
            "mongodb://10.255.255.1:27017/?serverSelectionTimeoutMS=60000",
        )
        .await
        .unwrap();
        let store = AtlasVectorStore::from_client(
            &client,
            "sample_mflix.embedded_movies".parse().unwrap(),
        )
        .with_timeout(Duration::from_millis(200));

        let query = VectorSearchQuery::new("vector_index", "plot_embedding_voyage_3_large");
        let err = store.vector_search(&[0.1, 0.2], &query).await.unwrap_err();

        assert!(matches!(err, VectorSearchError::Timeout(d) if d == Duration::from_millis(200)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_driver_failure_is_database_error() {
        // Nothing listens on port 1, so server selection fails quickly.
        let client = Client::with_uri_str(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
        )
        .await
        .unwrap();
        let store = AtlasVectorStore::from_client(
            &client,
            "sample_mflix.embedded_movies".parse().unwrap(),
        )
        .with_timeout(Duration::from_secs(10));

        let query = VectorSearchQuery::new("vector_index", "plot_embedding_voyage_3_large");
        let err = store.vector_search(&[0.1, 0.2], &query).await.unwrap_err();

        assert!(matches!(err, VectorSearchError::Database(_)));
        assert!(!err.is_retryable());
    }
}
