//! Paged reads over the chunk collection.

use async_stream::try_stream;
use futures_core::Stream;
use reqwest::Method;
use serde_json::{Map, Value, json};

use super::client::QdrantService;
use super::filters::match_all_filter;
use super::types::{QdrantError, ScrollResponse};

const PAGE_SIZE: usize = 256;

/// Scroll over chunk payloads; pages are fetched lazily as the stream is polled.
pub struct PayloadScroll<'a> {
    service: &'a QdrantService,
    fields: &'a [&'a str],
}

impl<'a> PayloadScroll<'a> {
    /// Read `fields` from every point of the collection.
    pub fn new(service: &'a QdrantService, fields: &'a [&'a str]) -> Self {
        Self { service, fields }
    }

    fn page_body(&self, offset: &Value) -> Value {
        json!({
            "with_payload": { "include": self.fields },
            "with_vector": false,
            "limit": PAGE_SIZE,
            "filter": match_all_filter(),
            "offset": offset,
        })
    }

    /// Yield each point payload; points stored without a payload are skipped.
    pub fn into_stream(self) -> impl Stream<Item = Result<Map<String, Value>, QdrantError>> + 'a {
        try_stream! {
            let path = format!("collections/{}/points/scroll", self.service.collection);
            let mut offset = Value::Null;
            let mut pages = 0usize;

            loop {
                let response = self
                    .service
                    .request(Method::POST, &path)?
                    .json(&self.page_body(&offset))
                    .send()
                    .await?;

                let response = successful(response, &self.service.collection, pages).await?;
                let ScrollResponse { result } = response.json().await?;
                pages += 1;
                for payload in result.points.into_iter().filter_map(|point| point.payload) {
                    yield payload;
                }

                match result.next_page_offset {
                    Some(next) if !next.is_null() => offset = next,
                    _ => break,
                }
            }

            tracing::debug!(collection = %self.service.collection, pages, "Chunk scroll finished");
        }
    }
}

async fn successful(
    response: reqwest::Response,
    collection: &str,
    pages: usize,
) -> Result<reqwest::Response, QdrantError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(collection, %status, pages, "Chunk scroll failed");
    Err(QdrantError::UnexpectedStatus { status, body })
}
