//! Streaming helpers for iterating Qdrant scroll endpoints without manual loops.

use async_stream::try_stream;
use futures_core::Stream;
use reqwest::Method;
use serde_json::{Map, Value, json};

use super::client::QdrantService;
use super::payload::string_field;
use super::types::{QdrantError, ScrollResponse};

/// Largest page requested from the scroll endpoint.
pub(crate) const MAX_SCROLL_PAGE: usize = 512;

/// Stream the `chunk_id` of every point in the collection.
///
/// Pages are requested lazily, so a consumer that stops early avoids fetching the rest of the
/// collection.
pub fn stream_chunk_ids<'a>(
    service: &'a QdrantService,
    page_size: usize,
) -> impl Stream<Item = Result<String, QdrantError>> + 'a {
    try_stream! {
        let mut offset: Option<Value> = None;
        let page_size = page_size.clamp(1, MAX_SCROLL_PAGE);

        loop {
            let mut body = Map::new();
            body.insert("with_payload".into(), json!(["chunk_id"]));
            body.insert("with_vector".into(), Value::Bool(false));
            body.insert("limit".into(), json!(page_size));
            body.insert("offset".into(), offset.clone().unwrap_or(Value::Null));

            let response = service
                .request(
                    Method::POST,
                    &format!("collections/{}/points/scroll", service.collection()),
                )
                .json(&Value::Object(body))
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let ScrollResponse { result } = response.json().await?;
                for point in result.points {
                    if let Some(id) = point.payload.as_ref().and_then(|p| string_field(p, "chunk_id")) {
                        yield id;
                    }
                }

                match result.next_page_offset {
                    Some(Value::Null) | None => break,
                    Some(next) => offset = Some(next),
                }
            } else {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(collection = service.collection(), status = %status, "Failed to scroll chunk ids");
                Err(QdrantError::UnexpectedStatus { status, body })?;
            }
        }
    }
}
