//! Helpers for building Qdrant points and reading their payloads back.

use crate::store::{QueryMatch, VectorRecord};
use crate::qdrant::types::ScoredPoint;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

/// Deterministic point id for a chunk id; Qdrant only accepts UUIDs or integers.
pub fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(record: &VectorRecord, timestamp_rfc3339: &str) -> Value {
    json!({
        "chunk_id": record.id,
        "text": record.metadata.text,
        "source": record.metadata.source,
        "ordinal": record.metadata.ordinal,
        "ingested_at": timestamp_rfc3339,
    })
}

/// Serialize a record into the point shape accepted by `PUT /points`.
pub(crate) fn build_point(record: &VectorRecord, timestamp_rfc3339: &str) -> Value {
    json!({
        "id": point_id(&record.id),
        "vector": record.vector,
        "payload": build_payload(record, timestamp_rfc3339),
    })
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Convert a scored point into a match; points missing `text` or `source` are skipped.
pub(crate) fn query_match(point: ScoredPoint) -> Option<QueryMatch> {
    let payload = point.payload?;
    Some(QueryMatch {
        text: string_field(&payload, "text")?,
        source: string_field(&payload, "source")?,
        score: point.score,
    })
}

pub(crate) fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload.get(key)?.as_str().map(str::to_string)
}
