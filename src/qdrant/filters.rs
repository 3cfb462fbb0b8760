//! Filter builders for Qdrant point selection.

use serde_json::{Value, json};

fn match_value(key: &str, value: Value) -> Value {
    json!({
        "key": key,
        "match": { "value": value }
    })
}

/// Select the first chunk of the document whose content hashes to `checksum`.
///
/// Only chunk 0 carries the checksum, so the index constraint keeps the lookup exact even
/// if a stray checksum lands on a later chunk.
pub fn first_chunk_checksum_filter(checksum: &str) -> Value {
    json!({
        "must": [
            match_value("checksum", Value::String(checksum.to_string())),
            match_value("chunk_index", json!(0)),
        ]
    })
}

/// Select every chunk belonging to the document titled `title`.
pub fn title_filter(title: &str) -> Value {
    json!({
        "must": [match_value("title", Value::String(title.to_string()))]
    })
}

/// Filter matching every point in a collection.
pub fn match_all_filter() -> Value {
    json!({ "must": [] })
}
