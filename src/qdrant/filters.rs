//! Filter helpers for Qdrant delete requests.

use std::collections::BTreeSet;

use serde_json::{Value, json};

/// Exact-match filter on the `source` payload field.
pub fn source_filter(source: &str) -> Value {
    json!({
        "must": [
            {
                "key": "source",
                "match": { "value": source }
            }
        ]
    })
}

/// Filter on `source` that spares the points whose `chunk_id` is in `keep`.
pub fn source_filter_except(source: &str, keep: &BTreeSet<String>) -> Value {
    let mut filter = source_filter(source);
    if !keep.is_empty() {
        filter["must_not"] = json!([
            {
                "key": "chunk_id",
                "match": { "any": keep }
            }
        ]);
    }
    filter
}

/// Payload indexes provisioned with the collection.
pub(crate) const PAYLOAD_INDEXES: [(&str, &str); 2] = [("source", "keyword"), ("chunk_id", "keyword")];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_filter_matches_exact_value() {
        assert_eq!(
            source_filter("notes/a b.md"),
            json!({
                "must": [
                    {
                        "key": "source",
                        "match": { "value": "notes/a b.md" }
                    }
                ]
            })
        );
    }

    #[test]
    fn source_filter_except_excludes_kept_chunk_ids() {
        let keep: BTreeSet<String> = ["a_0".to_string(), "a_2".to_string()].into();
        assert_eq!(
            source_filter_except("a", &keep),
            json!({
                "must": [
                    { "key": "source", "match": { "value": "a" } }
                ],
                "must_not": [
                    { "key": "chunk_id", "match": { "any": ["a_0", "a_2"] } }
                ]
            })
        );
        assert_eq!(source_filter_except("a", &BTreeSet::new()), source_filter("a"));
    }
}
