//! HTTP client wrapper for interacting with Qdrant.

use crate::config::Config;
use crate::qdrant::{
    filters::{PAYLOAD_INDEXES, source_filter_except},
    payload::{build_point, current_timestamp_rfc3339, point_id, query_match},
    scroller::{MAX_SCROLL_PAGE, stream_chunk_ids},
    types::{QdrantError, QueryResponse, QueryResponseResult, ScoredPoint},
};
use crate::store::{QueryMatch, StoreError, UpsertSummary, VectorRecord, VectorStore};
use async_trait::async_trait;
use futures_util::{pin_mut, stream::StreamExt};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Lightweight HTTP client for one Qdrant collection.
pub struct QdrantService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    vector_size: usize,
    batch_size: usize,
}

impl QdrantService {
    /// Construct a client for `collection` on the Qdrant instance at `url`.
    pub fn new(
        url: &str,
        collection: impl Into<String>,
        api_key: Option<String>,
        vector_size: usize,
        batch_size: usize,
    ) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("knowledge-rag/0.1").build()?;
        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        let collection = collection.into();

        tracing::debug!(
            url = %base_url,
            collection = %collection,
            has_api_key = %api_key.as_deref().is_some_and(|value| !value.is_empty()),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            collection,
            vector_size,
            batch_size: batch_size.max(1),
        })
    }

    /// Construct a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, QdrantError> {
        Self::new(
            &config.qdrant_url,
            config.qdrant_collection_name.clone(),
            config.qdrant_api_key.clone(),
            config.embedding_dimension,
            config.upsert_batch_size,
        )
    }

    /// Name of the collection this client writes to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection and its payload indexes when missing.
    pub async fn ensure_collection(&self) -> Result<(), QdrantError> {
        if !self.collection_exists().await? {
            tracing::info!(
                collection = %self.collection,
                vector_size = self.vector_size,
                "Creating collection"
            );
            self.create_collection().await?;
        }
        self.ensure_payload_indexes().await
    }

    async fn create_collection(&self) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": self.vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, "Collection created");
        })
        .await
    }

    async fn ensure_payload_indexes(&self) -> Result<(), QdrantError> {
        for (field, schema) in PAYLOAD_INDEXES {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{}/index", self.collection))
                .query(&[("wait", true)])
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() || response.status() == StatusCode::CONFLICT {
                tracing::debug!(collection = %self.collection, field, schema, "Payload index ensured");
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::warn!(collection = %self.collection, field, schema, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    async fn upsert_batch(&self, batch: &[VectorRecord], now: &str) -> Result<(), QdrantError> {
        let points: Vec<Value> = batch.iter().map(|record| build_point(record, now)).collect();

        let response = self
            .request(Method::PUT, &format!("collections/{}/points", self.collection))
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, points = batch.len(), "Points upserted");
        })
        .await
    }

    /// Perform a similarity search, returning scored payloads.
    pub async fn search_points(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.collection),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        Ok(points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect())
    }

    /// Delete points chosen by a selector (`{"points": [...]}` or `{"filter": {...}}`).
    async fn delete_points(&self, selector: Value) -> Result<(), QdrantError> {
        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/delete", self.collection),
            )
            .query(&[("wait", true)])
            .json(&selector)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, "Points deleted");
        })
        .await
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() == self.vector_size {
            Ok(())
        } else {
            Err(StoreError::DimensionMismatch {
                expected: self.vector_size,
                actual: vector.len(),
            })
        }
    }
}

#[async_trait]
impl VectorStore for QdrantService {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertSummary, StoreError> {
        for record in &records {
            self.check_dimension(&record.vector)?;
        }

        let total = records.len();
        let now = current_timestamp_rfc3339();
        let mut written = 0;

        for batch in records.chunks(self.batch_size) {
            match self.upsert_batch(batch, &now).await {
                Ok(()) => written += batch.len(),
                Err(error) if written == 0 => return Err(error.into()),
                Err(error) => {
                    tracing::error!(
                        collection = %self.collection,
                        written,
                        total,
                        error = %error,
                        "Upsert failed after earlier batches were committed"
                    );
                    return Err(StoreError::PartialWrite {
                        written,
                        total,
                        reason: error.to_string(),
                    });
                }
            }
        }

        Ok(UpsertSummary { written })
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, StoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(vector)?;

        let points = self.search_points(vector, top_k).await?;
        let total = points.len();
        let matches: Vec<QueryMatch> = points.into_iter().filter_map(query_match).collect();
        if matches.len() < total {
            tracing::warn!(
                collection = %self.collection,
                skipped = total - matches.len(),
                "Ignored points without text/source payload"
            );
        }
        Ok(matches)
    }

    async fn delete(&self, ids: &BTreeSet<String>) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let points: Vec<String> = ids.iter().map(|id| point_id(id)).collect();
        self.delete_points(json!({ "points": points })).await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        // An empty filter matches every point; the collection and its indexes stay in place.
        self.delete_points(json!({ "filter": {} })).await?;
        Ok(())
    }

    async fn list_ids(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let stream = stream_chunk_ids(self, limit.min(MAX_SCROLL_PAGE));
        pin_mut!(stream);

        let mut ids = Vec::new();
        while ids.len() < limit {
            match stream.next().await {
                Some(id) => ids.push(id?),
                None => break,
            }
        }
        Ok(ids)
    }

    fn supports_source_filter(&self) -> bool {
        true
    }

    async fn delete_by_source(
        &self,
        source: &str,
        keep: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        self.delete_points(json!({ "filter": source_filter_except(source, keep) }))
            .await?;
        Ok(())
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
