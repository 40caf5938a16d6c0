//! HTTP surface for the knowledge base.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Liveness message.
//! - `POST /upload` – Multipart upload (field `file`); extracts, chunks, embeds and indexes the
//!   document. Unsupported formats answer `415` with `{status: "error", filename, message}`.
//! - `GET /documents` – Registered document identifiers.
//! - `DELETE /documents/:filename` – Remove one document (idempotent).
//! - `POST /reset` – Remove every document.
//! - `POST /chat` – Answer `{query}` with `{answer, sources: [{text, source}]}`.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools.

use crate::pipeline::{PipelineError, RagApi};
use crate::uploads::{UploadArchive, sanitize_filename};
use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

struct AppState<S> {
    service: Arc<S>,
    uploads: Option<Arc<UploadArchive>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            uploads: self.uploads.clone(),
        }
    }
}

/// Build the HTTP router; uploads are also written to `uploads` when provided.
pub fn create_router<S>(service: Arc<S>, uploads: Option<UploadArchive>) -> Router
where
    S: RagApi + 'static,
{
    let state = AppState {
        service,
        uploads: uploads.map(Arc::new),
    };

    Router::new()
        .route("/", get(root))
        .route("/upload", post(upload_document::<S>))
        .route("/documents", get(list_documents::<S>))
        .route("/documents/:filename", delete(delete_document::<S>))
        .route("/reset", post(reset::<S>))
        .route("/chat", post(chat::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Knowledge RAG API is running" }))
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    status: &'static str,
    filename: String,
    chunks_added: usize,
}

/// Per-file failure for `POST /upload`.
#[derive(Serialize)]
struct UploadFailure {
    status: &'static str,
    filename: String,
    message: String,
}

/// Accept a multipart upload and index its text.
async fn upload_document<S>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<Response, AppError>
where
    S: RagApi,
{
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::bad_request(error.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|error| AppError::bad_request(error.to_string()))?;
            upload = Some((filename, bytes));
            break;
        }
    }

    let (raw_name, bytes) =
        upload.ok_or_else(|| AppError::bad_request("multipart field 'file' is required"))?;
    let filename = sanitize_filename(&raw_name)
        .ok_or_else(|| AppError::bad_request("uploaded file has no usable filename"))?;

    if let Some(archive) = &state.uploads
        && let Err(error) = archive.persist(&filename, &bytes).await
    {
        tracing::warn!(filename = %filename, error = %error, "Failed to keep raw upload");
    }

    match state.service.ingest_document(&filename, &bytes).await {
        Ok(outcome) => {
            tracing::info!(filename = %filename, chunks = outcome.chunks_added, "Upload request completed");
            Ok(Json(UploadResponse {
                status: "success",
                filename,
                chunks_added: outcome.chunks_added,
            })
            .into_response())
        }
        Err(PipelineError::UnsupportedFormat(error)) => Ok((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(UploadFailure {
                status: "error",
                filename,
                message: error.to_string(),
            }),
        )
            .into_response()),
        Err(other) => Err(other.into()),
    }
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<String>,
}

async fn list_documents<S>(State(state): State<AppState<S>>) -> Json<DocumentsResponse>
where
    S: RagApi,
{
    Json(DocumentsResponse {
        documents: state.service.list_documents().await,
    })
}

async fn delete_document<S>(
    State(state): State<AppState<S>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError>
where
    S: RagApi,
{
    let status = state.service.delete(&filename).await?;
    Ok(Json(status).into_response())
}

async fn reset<S>(State(state): State<AppState<S>>) -> Result<Response, AppError>
where
    S: RagApi,
{
    let status = state.service.reset().await?;
    Ok(Json(status).into_response())
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    query: String,
}

/// Response body for `POST /chat`.
#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<SourceView>,
}

#[derive(Serialize)]
struct SourceView {
    text: String,
    source: String,
}

async fn chat<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError>
where
    S: RagApi,
{
    let result = state.service.answer(&request.query).await?;
    Ok(Json(ChatResponse {
        answer: result.answer,
        sources: result
            .sources
            .into_iter()
            .map(|m| SourceView {
                text: m.text,
                source: m.source,
            })
            .collect(),
    }))
}

async fn get_metrics<S>(State(state): State<AppState<S>>) -> Response
where
    S: RagApi,
{
    Json(state.service.metrics_snapshot()).into_response()
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Multipart upload (field 'file') of a .txt or .md document; the text is chunked, embedded and indexed. Returns { \"status\", \"filename\", \"chunks_added\" }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/documents",
                description: "Return the identifiers of indexed documents.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_document",
                method: "DELETE",
                path: "/documents/{filename}",
                description: "Remove every chunk of one document. Unknown documents succeed.",
                request_example: None,
            },
            CommandDescriptor {
                name: "reset",
                method: "POST",
                path: "/reset",
                description: "Remove every document from the knowledge base.",
                request_example: None,
            },
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/chat",
                description: "Answer a question from the indexed documents, with the chunks used as sources.",
                request_example: Some(json!({ "query": "What is the refund window?" })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "status": "error", "message": self.message })),
        )
            .into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        let status = match &inner {
            PipelineError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            PipelineError::InvalidInput(_) | PipelineError::Chunking(_) => StatusCode::BAD_REQUEST,
            PipelineError::Embedding(_)
            | PipelineError::Generation(_)
            | PipelineError::StoreWrite(_)
            | PipelineError::StoreRead(_) => StatusCode::BAD_GATEWAY,
        };
        if status == StatusCode::BAD_GATEWAY {
            tracing::error!(error = %inner, "Upstream failure");
        }
        Self {
            status,
            message: inner.to_string(),
        }
    }
}
