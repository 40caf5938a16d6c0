use std::{env, sync::Once};

use knowledge_rag::{config, embedding, pipeline::RagService};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() {
    INIT.call_once(|| {
        set_default_env("QDRANT_URL", "http://127.0.0.1:6333");
        set_default_env("QDRANT_COLLECTION_NAME", "knowledge-rag-live");
        set_default_env("EMBEDDING_PROVIDER", "ollama");
        set_default_env("EMBEDDING_MODEL", "nomic-embed-text");
        set_default_env("EMBEDDING_DIMENSION", "768");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        set_default_env("GENERATION_PROVIDER", "ollama");
        set_default_env("GENERATION_MODEL", "llama3.2");
        config::init_config();
    });
}

#[tokio::test]
#[ignore = "Requires live Ollama embeddings"]
async fn live_ollama_embedding_roundtrip() {
    init_config_once();
    let client = embedding::get_embedding_client(config::get_config());
    let vectors = client
        .generate_embeddings(vec!["knowledge-rag live embedding".to_string()])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected embedding per input chunk");
    let dimension = config::get_config().embedding_dimension;
    assert_eq!(vectors[0].len(), dimension, "embedding dimension mismatch");
}

#[tokio::test]
#[ignore = "Requires live Qdrant, Ollama embeddings and Ollama generation"]
async fn live_ingest_answer_delete() {
    init_config_once();
    let service = RagService::new()
        .await
        .expect("Qdrant should be reachable with the configured collection");

    let outcome = service
        .ingest(
            "live-check.txt",
            "The observatory on Mount Kelso opens to visitors every second Tuesday.",
        )
        .await
        .expect("ingest");
    assert!(outcome.chunks_added > 0);

    let result = service
        .answer("When does the Mount Kelso observatory open?")
        .await
        .expect("answer");
    assert!(
        result.sources.iter().any(|m| m.source == "live-check.txt"),
        "ingested document should be retrieved: {:?}",
        result.sources
    );
    assert!(!result.answer.trim().is_empty());

    service.delete("live-check.txt").await.expect("delete");
    assert!(!service
        .list_documents()
        .await
        .contains(&"live-check.txt".to_string()));
}
