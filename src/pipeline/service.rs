//! Pipeline service coordinating extraction, chunking, embedding, retrieval and generation.

use crate::{
    chunking::{chunk_text, parse_chunk_id},
    config::{Config, get_config},
    embedding::{EmbeddingClient, get_embedding_client},
    extract::{PlainTextExtractor, TextExtractor},
    generation::{GenerationClient, get_generation_client},
    metrics::{MetricsSnapshot, PipelineMetrics},
    pipeline::{
        prompt::build_prompt,
        types::{AnswerResult, IngestOutcome, OperationStatus, PipelineError, PipelineSettings},
    },
    qdrant::{QdrantError, QdrantService},
    registry::CorpusRegistry,
    retrieval::Retriever,
    store::{RecordMetadata, StoreError, VectorRecord, VectorStore},
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Composes the retrieval-augmented generation pipeline.
///
/// The service owns long-lived handles to the embedding client, vector store, generator and
/// corpus registry so that every request shares them. Construct it once near process start and
/// share it through an `Arc`.
pub struct RagService {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerationClient>,
    retriever: Retriever,
    registry: CorpusRegistry,
    metrics: PipelineMetrics,
    settings: PipelineSettings,
}

/// Abstraction over the pipeline used by external surfaces (HTTP).
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Extract text from an uploaded blob, then ingest it.
    async fn ingest_document(
        &self,
        identifier: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome, PipelineError>;

    /// Answer a question from the indexed corpus.
    async fn answer(&self, query: &str) -> Result<AnswerResult, PipelineError>;

    /// Registered document identifiers in first-ingested order.
    async fn list_documents(&self) -> Vec<String>;

    /// Remove one document from the store and the registry.
    async fn delete(&self, source: &str) -> Result<OperationStatus, PipelineError>;

    /// Remove every document.
    async fn reset(&self) -> Result<OperationStatus, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl RagService {
    /// Build the service from the global configuration, provisioning the Qdrant collection.
    pub async fn new() -> Result<Self, QdrantError> {
        Self::from_config(get_config()).await
    }

    /// Build the service from `config`, provisioning the Qdrant collection.
    pub async fn from_config(config: &Config) -> Result<Self, QdrantError> {
        tracing::info!(provider = ?config.embedding_provider, model = %config.embedding_model, "Initializing embedding client");
        let embedder = get_embedding_client(config);
        tracing::info!(provider = ?config.generation_provider, model = %config.generation_model, "Initializing generation client");
        let generator = get_generation_client(config);

        let qdrant = QdrantService::from_config(config)?;
        qdrant.ensure_collection().await?;
        tracing::debug!(collection = %config.qdrant_collection_name, "Primary collection ready");

        Ok(Self::with_components(
            embedder,
            Arc::new(qdrant),
            generator,
            PipelineSettings::from_config(config),
        ))
    }

    /// Assemble the service from explicit components; the registry starts empty.
    pub fn with_components(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn GenerationClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor: Arc::new(PlainTextExtractor::new()),
            retriever: Retriever::new(Arc::clone(&embedder), Arc::clone(&store)),
            embedder,
            store,
            generator,
            registry: CorpusRegistry::new(),
            metrics: PipelineMetrics::new(),
            settings,
        }
    }

    /// Replace the text extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Extract text from `bytes` and ingest it under `identifier`.
    pub async fn ingest_document(
        &self,
        identifier: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome, PipelineError> {
        let text = self.extractor.extract(identifier, bytes).map_err(|error| {
            tracing::warn!(identifier, error = %error, "Rejected document");
            PipelineError::UnsupportedFormat(error)
        })?;
        self.ingest(identifier, &text).await
    }

    /// Chunk, embed and index `raw_text` under `identifier`.
    ///
    /// Embedding failures abort before anything is written. The identifier is registered only
    /// after the upsert succeeds, and records left over from an earlier, longer version of the
    /// document are removed before the registry is released.
    pub async fn ingest(
        &self,
        identifier: &str,
        raw_text: &str,
    ) -> Result<IngestOutcome, PipelineError> {
        let source = require_identifier(identifier)?;
        let chunks = chunk_text(source, raw_text, self.settings.chunk_size)?;
        let total_chunks = chunks.len();

        // Whitespace-only windows carry nothing to embed.
        let (chunks, blank): (Vec<_>, Vec<_>) = chunks
            .into_iter()
            .partition(|chunk| !chunk.text.trim().is_empty());
        if !blank.is_empty() {
            let skipped: Vec<usize> = blank.iter().map(|chunk| chunk.ordinal).collect();
            tracing::debug!(source, ?skipped, "Skipping whitespace-only chunks");
        }

        if chunks.is_empty() {
            let mut registry = self.registry.lock().await;
            if registry.contains(source) {
                self.purge_source(source, &BTreeSet::new()).await?;
                registry.remove(source);
            }
            drop(registry);
            tracing::info!(source, total_chunks, "Document produced no indexable chunks");
            return Ok(IngestOutcome { chunks_added: 0 });
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self
            .embedder
            .generate_embeddings(texts)
            .await
            .inspect_err(|error| tracing::error!(source, error = %error, "Embedding failed"))?;

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord {
                id: chunk.id,
                vector,
                metadata: RecordMetadata {
                    text: chunk.text,
                    source: chunk.source,
                    ordinal: chunk.ordinal,
                },
            })
            .collect();
        let kept: BTreeSet<String> = records.iter().map(|record| record.id.clone()).collect();

        let mut registry = self.registry.lock().await;
        let summary = self.store.upsert(records).await.map_err(|error| {
            if let StoreError::PartialWrite { written, total, .. } = &error {
                tracing::error!(source, written, total, "Document partially indexed; delete or re-ingest it");
            } else {
                tracing::error!(source, error = %error, "Upsert failed");
            }
            PipelineError::StoreWrite(error)
        })?;
        registry.add(source);
        self.purge_source(source, &kept).await.inspect_err(|error| {
            tracing::error!(source, error = %error, "Failed to remove stale chunks");
        })?;
        drop(registry);

        self.metrics.record_ingest(summary.written as u64);
        tracing::info!(
            source,
            chunks = summary.written,
            skipped_blank = total_chunks - summary.written,
            chunk_size = self.settings.chunk_size,
            "Document indexed"
        );

        Ok(IngestOutcome {
            chunks_added: summary.written,
        })
    }

    /// Answer `query` from the top matches, or with the no-context placeholder.
    pub async fn answer(&self, query: &str) -> Result<AnswerResult, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "query must not be empty".to_string(),
            ));
        }

        let matches = self.retriever.retrieve(query, self.settings.top_k).await?;
        if matches.is_empty() {
            self.metrics.record_answer(false);
            tracing::info!(top_k = self.settings.top_k, "No context available for query");
            return Ok(AnswerResult::no_context());
        }

        let prompt = build_prompt(query, &matches);
        let answer = self
            .generator
            .generate(&prompt)
            .await
            .inspect_err(|error| tracing::error!(error = %error, "Generation failed"))?;

        self.metrics.record_answer(true);
        tracing::info!(matches = matches.len(), "Answered query");
        Ok(AnswerResult {
            answer,
            sources: matches,
        })
    }

    /// Registered document identifiers in first-ingested order.
    pub async fn list_documents(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Remove every record of `source` and unregister it. Unknown sources succeed.
    pub async fn delete(&self, source: &str) -> Result<OperationStatus, PipelineError> {
        let source = require_identifier(source)?;

        let mut registry = self.registry.lock().await;
        let was_registered = registry.contains(source);
        self.purge_source(source, &BTreeSet::new()).await?;
        registry.remove(source);
        drop(registry);

        self.metrics.record_delete();
        tracing::info!(source, was_registered, "Document deleted");

        Ok(if was_registered {
            OperationStatus::success(format!("Deleted '{source}' from the knowledge base."))
        } else {
            OperationStatus::success(format!(
                "Nothing was registered under '{source}'; no documents were deleted."
            ))
        })
    }

    /// Drop every record and clear the registry.
    pub async fn reset(&self) -> Result<OperationStatus, PipelineError> {
        let mut registry = self.registry.lock().await;
        self.store.delete_all().await.map_err(|error| {
            tracing::error!(error = %error, "Reset failed");
            PipelineError::StoreWrite(error)
        })?;
        registry.reset();
        drop(registry);

        self.metrics.record_reset();
        tracing::info!("Knowledge base reset");
        Ok(OperationStatus::success("Knowledge base reset."))
    }

    /// Retrieve the current metrics snapshot for diagnostics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Delete the records of `source` except the ids in `keep`.
    async fn purge_source(
        &self,
        source: &str,
        keep: &BTreeSet<String>,
    ) -> Result<(), PipelineError> {
        if self.store.supports_source_filter() {
            return self
                .store
                .delete_by_source(source, keep)
                .await
                .map_err(PipelineError::StoreWrite);
        }

        let limit = self.settings.delete_scan_limit;
        let ids = self
            .store
            .list_ids(limit)
            .await
            .map_err(PipelineError::StoreRead)?;
        if ids.len() >= limit {
            tracing::warn!(
                source,
                limit,
                "Delete scan hit its result cap; records beyond it may remain"
            );
        }

        let matching: BTreeSet<String> = ids
            .into_iter()
            .filter(|id| parse_chunk_id(source, id).is_some() && !keep.contains(id))
            .collect();
        if matching.is_empty() {
            return Ok(());
        }
        tracing::debug!(source, records = matching.len(), "Deleting records found by id scan");
        self.store
            .delete(&matching)
            .await
            .map_err(PipelineError::StoreWrite)
    }
}

#[async_trait]
impl RagApi for RagService {
    async fn ingest_document(
        &self,
        identifier: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome, PipelineError> {
        RagService::ingest_document(self, identifier, bytes).await
    }

    async fn answer(&self, query: &str) -> Result<AnswerResult, PipelineError> {
        RagService::answer(self, query).await
    }

    async fn list_documents(&self) -> Vec<String> {
        RagService::list_documents(self).await
    }

    async fn delete(&self, source: &str) -> Result<OperationStatus, PipelineError> {
        RagService::delete(self, source).await
    }

    async fn reset(&self) -> Result<OperationStatus, PipelineError> {
        RagService::reset(self).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RagService::metrics_snapshot(self)
    }
}

fn require_identifier(identifier: &str) -> Result<&str, PipelineError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidInput(
            "document identifier must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingClientError, HashingEmbeddingClient};
    use crate::generation::GenerationClientError;
    use crate::pipeline::NO_CONTEXT_ANSWER;
    use crate::store::InMemoryVectorStore;
    use std::sync::Mutex;

    const DIM: usize = 256;

    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerationClient for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationClientError> {
            self.prompts.lock().expect("prompts").push(prompt.to_string());
            Ok("grounded answer".to_string())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingClient for FailingEmbedder {
        fn dimension(&self) -> usize {
            DIM
        }

        async fn generate_embeddings(
            &self,
            _texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Err(EmbeddingClientError::ProviderUnavailable("offline".into()))
        }
    }

    fn settings(chunk_size: usize) -> PipelineSettings {
        PipelineSettings {
            chunk_size,
            top_k: 3,
            delete_scan_limit: 1_000,
        }
    }

    fn service_with(
        store: Arc<InMemoryVectorStore>,
        generator: Arc<RecordingGenerator>,
    ) -> RagService {
        RagService::with_components(
            Arc::new(HashingEmbeddingClient::new(DIM)),
            store,
            generator,
            settings(20),
        )
    }

    #[tokio::test]
    async fn ingest_indexes_chunks_and_registers_source() {
        let store = Arc::new(InMemoryVectorStore::new(DIM));
        let service = service_with(Arc::clone(&store), Arc::default());

        let outcome = service
            .ingest("notes.txt", "The quick brown fox jumps over the lazy dog.")
            .await
            .expect("ingest");

        assert_eq!(outcome.chunks_added, 3);
        assert_eq!(store.len().await, 3);
        assert!(store.contains("notes.txt_0").await);
        assert_eq!(service.list_documents().await, vec!["notes.txt"]);
        assert_eq!(service.metrics_snapshot().chunks_indexed, 3);
    }

    #[tokio::test]
    async fn empty_text_touches_nothing() {
        let store = Arc::new(InMemoryVectorStore::new(DIM));
        let service = service_with(Arc::clone(&store), Arc::default());

        let outcome = service.ingest("empty.txt", "").await.expect("ingest");
        assert_eq!(outcome.chunks_added, 0);
        assert!(store.is_empty().await);
        assert!(service.list_documents().await.is_empty());
    }

    #[tokio::test]
    async fn blank_reingest_removes_registered_document() {
        let store = Arc::new(InMemoryVectorStore::new(DIM));
        let service = service_with(Arc::clone(&store), Arc::default());
        service
            .ingest("draft.txt", "first draft with real words")
            .await
            .expect("ingest");

        let outcome = service.ingest("draft.txt", "   \n\t  ").await.expect("reingest");

        assert_eq!(outcome.chunks_added, 0);
        assert!(store.is_empty().await);
        assert!(service.list_documents().await.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_leaves_no_partial_index() {
        let store = Arc::new(InMemoryVectorStore::new(DIM));
        let service = RagService::with_components(
            Arc::new(FailingEmbedder),
            Arc::clone(&store) as Arc<dyn VectorStore>,
            Arc::new(RecordingGenerator::default()),
            settings(10),
        );

        let error = service
            .ingest("doc.txt", "some words to embed")
            .await
            .unwrap_err();
        assert!(matches!(error, PipelineError::Embedding(_)));
        assert!(store.is_empty().await);
        assert!(service.list_documents().await.is_empty());
    }

    #[tokio::test]
    async fn unsupported_document_is_rejected() {
        let service = service_with(Arc::new(InMemoryVectorStore::new(DIM)), Arc::default());
        let error = service
            .ingest_document("slides.pdf", b"%PDF-1.7")
            .await
            .unwrap_err();
        assert!(matches!(error, PipelineError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn answer_builds_prompt_from_ranked_context() {
        let generator = Arc::new(RecordingGenerator::default());
        let service = service_with(
            Arc::new(InMemoryVectorStore::new(DIM)),
            Arc::clone(&generator),
        );
        service
            .ingest("refunds.md", "Refunds are issued within thirty days")
            .await
            .expect("ingest");

        let result = service.answer("When are refunds issued?").await.expect("answer");

        assert_eq!(result.answer, "grounded answer");
        assert!(!result.sources.is_empty());
        assert!(result.sources.iter().all(|m| m.source == "refunds.md"));
        let prompts = generator.prompts.lock().expect("prompts");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Question: When are refunds issued?"));
        assert!(prompts[0].ends_with("Answer:"));
    }

    #[tokio::test]
    async fn empty_corpus_returns_placeholder_without_generating() {
        let generator = Arc::new(RecordingGenerator::default());
        let service = service_with(
            Arc::new(InMemoryVectorStore::new(DIM)),
            Arc::clone(&generator),
        );

        let result = service.answer("anything?").await.expect("answer");
        assert_eq!(result.answer, NO_CONTEXT_ANSWER);
        assert!(result.sources.is_empty());
        assert!(generator.prompts.lock().expect("prompts").is_empty());
        assert_eq!(service.metrics_snapshot().no_context_answers, 1);
    }

    #[tokio::test]
    async fn delete_scan_respects_source_boundaries() {
        let store = Arc::new(InMemoryVectorStore::new(DIM));
        let service = service_with(Arc::clone(&store), Arc::default());
        service.ingest("a", "alpha words here").await.expect("a");
        service.ingest("a_b", "beta words here").await.expect("a_b");

        let status = service.delete("a").await.expect("delete");

        assert_eq!(status.status, "success");
        assert_eq!(status.message, "Deleted 'a' from the knowledge base.");
        assert!(!store.contains("a_0").await);
        assert!(store.contains("a_b_0").await);
        assert_eq!(service.list_documents().await, vec!["a_b"]);
    }

    #[tokio::test]
    async fn deleting_unknown_source_succeeds() {
        let service = service_with(Arc::new(InMemoryVectorStore::new(DIM)), Arc::default());
        let status = service.delete("ghost.txt").await.expect("delete");
        assert_eq!(status.status, "success");
        assert!(status.message.contains("Nothing was registered"));
    }

    #[tokio::test]
    async fn reset_clears_store_and_registry() {
        let store = Arc::new(InMemoryVectorStore::new(DIM));
        let service = service_with(Arc::clone(&store), Arc::default());
        service.ingest("one.txt", "first document").await.expect("one");

        let status = service.reset().await.expect("reset");
        assert_eq!(status.message, "Knowledge base reset.");
        assert!(store.is_empty().await);
        assert!(service.list_documents().await.is_empty());
    }

    #[tokio::test]
    async fn blank_identifier_and_query_are_invalid() {
        let service = service_with(Arc::new(InMemoryVectorStore::new(DIM)), Arc::default());
        assert!(matches!(
            service.ingest("  ", "text").await,
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            service.answer("").await,
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            service.delete("").await,
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
