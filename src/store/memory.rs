use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    QueryMatch, RecordMetadata, StoreError, UpsertSummary, VectorRecord, VectorStore,
    cosine_similarity,
};

/// In-memory vector store with brute-force cosine ranking.
///
/// Suitable for tests and small offline corpora. It has no metadata filter, so deletions by
/// source go through the client-side id scan.
pub struct InMemoryVectorStore {
    dimension: usize,
    records: RwLock<BTreeMap<String, (Vec<f32>, RecordMetadata)>>,
}

impl InMemoryVectorStore {
    /// Create an empty store accepting vectors of `dimension` components.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Whether a record with `id` exists.
    pub async fn contains(&self, id: &str) -> bool {
        self.records.read().await.contains_key(id)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            })
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertSummary, StoreError> {
        // Validate the whole batch first so a bad vector never leaves a half-written batch.
        for record in &records {
            self.check_dimension(&record.vector)?;
        }

        let written = records.len();
        let mut guard = self.records.write().await;
        for record in records {
            guard.insert(record.id, (record.vector, record.metadata));
        }
        Ok(UpsertSummary { written })
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, StoreError> {
        self.check_dimension(vector)?;
        let guard = self.records.read().await;

        let mut scored: Vec<(&String, f32, &RecordMetadata)> = guard
            .iter()
            .map(|(id, (stored, metadata))| (id, cosine_similarity(vector, stored), metadata))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, score, metadata)| QueryMatch {
                text: metadata.text.clone(),
                source: metadata.source.clone(),
                score,
            })
            .collect())
    }

    async fn delete(&self, ids: &BTreeSet<String>) -> Result<(), StoreError> {
        let mut guard = self.records.write().await;
        for id in ids {
            guard.remove(id);
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn list_ids(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, source: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector,
            metadata: RecordMetadata {
                text: format!("text of {id}"),
                source: source.to_string(),
                ordinal: 0,
            },
        }
    }

    #[tokio::test]
    async fn query_returns_sorted_matches() {
        let store = InMemoryVectorStore::new(3);
        store
            .upsert(vec![
                record("far", "a", vec![0.0, 1.0, 0.0]),
                record("close", "b", vec![1.0, 0.0, 0.0]),
                record("medium", "c", vec![0.5, 0.5, 0.0]),
            ])
            .await
            .expect("upsert");

        let results = store.query(&[1.0, 0.0, 0.0], 3).await.expect("query");
        let sources: Vec<_> = results.iter().map(|m| m.source.as_str()).collect();
        assert_eq!(sources, vec!["b", "c", "a"]);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn query_respects_top_k_and_small_stores() {
        let store = InMemoryVectorStore::new(2);
        store
            .upsert(vec![record("1", "a", vec![1.0, 0.0])])
            .await
            .expect("upsert");

        assert_eq!(store.query(&[1.0, 0.0], 100).await.expect("query").len(), 1);
        assert!(store.query(&[1.0, 0.0], 0).await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new(1);
        store
            .upsert(vec![record("same-id", "a", vec![1.0])])
            .await
            .expect("first");
        store
            .upsert(vec![record("same-id", "b", vec![1.0])])
            .await
            .expect("second");

        assert_eq!(store.len().await, 1);
        let results = store.query(&[1.0], 5).await.expect("query");
        assert_eq!(results[0].source, "b");
    }

    #[tokio::test]
    async fn dimension_mismatch_rejects_whole_batch() {
        let store = InMemoryVectorStore::new(2);
        let error = store
            .upsert(vec![
                record("ok", "a", vec![1.0, 0.0]),
                record("bad", "a", vec![1.0]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn delete_ignores_unknown_ids_and_delete_all_clears() {
        let store = InMemoryVectorStore::new(1);
        store
            .upsert(vec![record("a_0", "a", vec![1.0]), record("b_0", "b", vec![1.0])])
            .await
            .expect("upsert");

        let ids: BTreeSet<String> = ["a_0".to_string(), "missing".to_string()].into();
        store.delete(&ids).await.expect("delete");
        assert!(!store.contains("a_0").await);
        assert!(store.contains("b_0").await);

        store.delete_all().await.expect("delete all");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn list_ids_honours_limit_and_lacks_source_filter() {
        let store = InMemoryVectorStore::new(1);
        store
            .upsert(vec![
                record("a_0", "a", vec![1.0]),
                record("a_1", "a", vec![1.0]),
                record("b_0", "b", vec![1.0]),
            ])
            .await
            .expect("upsert");

        assert_eq!(store.list_ids(2).await.expect("ids"), vec!["a_0", "a_1"]);
        assert!(!store.supports_source_filter());
        assert!(matches!(
            store.delete_by_source("a", &BTreeSet::new()).await,
            Err(StoreError::Unsupported(_))
        ));
    }
}
