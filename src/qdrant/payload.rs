//! Helpers for constructing Qdrant point payloads.

use crate::store::ChunkRecord;
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// Build the payload object stored alongside each chunk vector.
///
/// The checksum is written only when the record carries one, which is the case for chunk 0.
pub(crate) fn build_payload(record: &ChunkRecord) -> Value {
    let mut payload = Map::new();
    payload.insert("title".into(), Value::String(record.title.clone()));
    payload.insert("content".into(), Value::String(record.content.clone()));
    payload.insert("category".into(), Value::String(record.category.clone()));
    payload.insert(
        "tags".into(),
        Value::Array(
            record
                .tags
                .iter()
                .map(|tag| Value::String(tag.clone()))
                .collect(),
        ),
    );
    payload.insert("chunk_index".into(), json!(record.chunk_index));
    payload.insert("total_chunks".into(), json!(record.total_chunks));
    payload.insert("word_count".into(), json!(record.word_count));
    payload.insert("model".into(), Value::String(record.model.clone()));
    payload.insert("dimensions".into(), json!(record.embedding.len()));
    payload.insert("created_at".into(), Value::String(record.created_at.clone()));

    if let Some(checksum) = record.checksum.as_ref() {
        payload.insert("checksum".into(), Value::String(checksum.clone()));
    }

    if let Some(source_file) = record
        .source_file
        .as_ref()
        .filter(|value| !value.is_empty())
    {
        payload.insert("source_file".into(), Value::String(source_file.clone()));
    }

    if let Some(uploaded_by) = record
        .uploaded_by
        .as_ref()
        .filter(|value| !value.is_empty())
    {
        payload.insert("uploaded_by".into(), Value::String(uploaded_by.clone()));
    }

    Value::Object(payload)
}

/// Construct an identifier suitable for a Qdrant point.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(checksum: Option<&str>) -> ChunkRecord {
        ChunkRecord {
            title: "Handbook".into(),
            content: "sample text".into(),
            category: "HR".into(),
            tags: vec!["policy".into()],
            chunk_index: 0,
            total_chunks: 1,
            word_count: 2,
            embedding: vec![0.1, 0.2, 0.3],
            checksum: checksum.map(str::to_string),
            source_file: Some("handbook.pdf".into()),
            uploaded_by: None,
            model: "all-minilm".into(),
            created_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn payload_includes_record_fields() {
        let payload = build_payload(&record(Some("abc")));
        assert_eq!(payload["title"], "Handbook");
        assert_eq!(payload["content"], "sample text");
        assert_eq!(payload["category"], "HR");
        assert_eq!(payload["chunk_index"], 0);
        assert_eq!(payload["total_chunks"], 1);
        assert_eq!(payload["word_count"], 2);
        assert_eq!(payload["dimensions"], 3);
        assert_eq!(payload["checksum"], "abc");
        assert_eq!(payload["source_file"], "handbook.pdf");
        assert!(payload.get("uploaded_by").is_none());
        assert_eq!(payload["tags"], json!(["policy"]));
    }

    #[test]
    fn payload_omits_missing_checksum() {
        let payload = build_payload(&record(None));
        assert!(payload.get("checksum").is_none());
    }

    #[test]
    fn point_ids_are_unique() {
        assert_ne!(generate_point_id(), generate_point_id());
    }
}
