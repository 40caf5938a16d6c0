use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use httpmock::{
    Method::{DELETE, GET, POST, PUT},
    MockServer,
};
use knowledge_rag::{api, config, logging, pipeline::RagService};
use regex::Regex;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tower::ServiceExt;

static INIT: OnceCell<&'static MockServer> = OnceCell::const_new();

const COLLECTION: &str = "knowledge";
const BOUNDARY: &str = "http-stack-boundary";

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

/// Start one mock server standing in for Qdrant, Ollama and Gemini, and load config once.
async fn mock_backend() -> &'static MockServer {
    INIT.get_or_init(|| async {
        let server: &'static MockServer = Box::leak(Box::new(MockServer::start_async().await));
        let base_url = server.base_url();

        set_env("QDRANT_URL", &base_url);
        set_env("QDRANT_COLLECTION_NAME", COLLECTION);
        set_env("EMBEDDING_PROVIDER", "ollama");
        set_env("EMBEDDING_MODEL", "nomic-embed-text");
        set_env("EMBEDDING_DIMENSION", "4");
        set_env("OLLAMA_URL", &base_url);
        set_env("GENERATION_PROVIDER", "gemini");
        set_env("GENERATION_MODEL", "gemini-test");
        set_env("GEMINI_API_KEY", "test-key");
        set_env("GEMINI_BASE_URL", &base_url);
        set_env(
            "RAG_LOG_FILE",
            &std::env::temp_dir()
                .join("knowledge-rag-http-stack.log")
                .to_string_lossy(),
        );
        config::init_config();
        logging::init_tracing();

        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/collections/{COLLECTION}"));
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        let collection_or_index =
            Regex::new(&format!(r"^/collections/{COLLECTION}(/index)?$")).expect("regex");
        server
            .mock_async(move |when, then| {
                when.method(PUT).path_matches(collection_or_index);
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path(format!("/collections/{COLLECTION}/points"))
                    .query_param("wait", "true");
                then.status(200)
                    .json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(format!("/collections/{COLLECTION}/points/query"));
                then.status(200).json_body(json!({
                    "result": {
                        "points": [{
                            "id": "3f1c6a1e-0000-5000-8000-000000000000",
                            "score": 0.91,
                            "payload": {
                                "chunk_id": "notes.txt_0",
                                "text": "Refunds are issued within thirty days.",
                                "source": "notes.txt"
                            }
                        }]
                    }
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(200)
                    .json_body(json!({ "embeddings": [[0.1, 0.2, 0.3, 0.4]] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-test:generateContent")
                    .header("x-goog-api-key", "test-key");
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "Thirty days." }] } }]
                }));
            })
            .await;

        server
    })
    .await
}

async fn app() -> (Router, &'static MockServer) {
    let server = mock_backend().await;
    let service = RagService::new().await.expect("pipeline");
    (api::create_router(Arc::new(service), None), server)
}

fn upload(filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn upload_chat_delete_reset_round_trip() {
    let (app, server) = app().await;

    let stale_cleanup = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/collections/{COLLECTION}/points/delete"))
                .body_contains("\"must_not\"")
                .body_contains("notes.txt_0");
            then.status(200).json_body(json!({ "result": {} }));
        })
        .await;
    let (status, body) = send(&app, upload("notes.txt", "Refunds are issued within thirty days.")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "success", "filename": "notes.txt", "chunks_added": 1 })
    );
    stale_cleanup.assert();

    let (_, body) = send(&app, request(Method::GET, "/documents", None)).await;
    assert_eq!(body, json!({ "documents": ["notes.txt"] }));

    let (status, body) = send(
        &app,
        request(Method::POST, "/chat", Some(json!({ "query": "What is the refund window?" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Thirty days.");
    assert_eq!(
        body["sources"],
        json!([{ "text": "Refunds are issued within thirty days.", "source": "notes.txt" }])
    );

    let delete_by_filter = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/collections/{COLLECTION}/points/delete"))
                .body_contains("\"key\":\"source\"")
                .body_contains("notes.txt");
            then.status(200).json_body(json!({ "result": {} }));
        })
        .await;
    let (status, body) = send(&app, request(Method::DELETE, "/documents/notes.txt", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted 'notes.txt' from the knowledge base.");
    delete_by_filter.assert();

    let clear_points = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/collections/{COLLECTION}/points/delete"))
                .json_body(json!({ "filter": {} }));
            then.status(200).json_body(json!({ "result": {} }));
        })
        .await;
    let drop_collection = server
        .mock_async(|when, then| {
            when.method(DELETE).path(format!("/collections/{COLLECTION}"));
            then.status(200).json_body(json!({ "result": true }));
        })
        .await;
    let (status, body) = send(&app, request(Method::POST, "/reset", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Knowledge base reset.");
    clear_points.assert();
    drop_collection.assert_hits(0);

    let (_, body) = send(&app, request(Method::GET, "/documents", None)).await;
    assert_eq!(body, json!({ "documents": [] }));

    let (_, body) = send(&app, request(Method::GET, "/metrics", None)).await;
    assert_eq!(body["documents_ingested"], 1);
    assert_eq!(body["questions_answered"], 1);
    assert_eq!(body["resets"], 1);
}

#[tokio::test]
async fn unsupported_upload_never_reaches_backends() {
    let (app, _server) = app().await;

    let (status, body) = send(&app, upload("slides.pdf", "%PDF-1.7")).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["filename"], "slides.pdf");

    let (_, body) = send(&app, request(Method::GET, "/documents", None)).await;
    assert_eq!(body, json!({ "documents": [] }));
}
