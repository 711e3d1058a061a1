use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::Result;
use crate::http::{post_json, put_json, resource_exists};
use crate::retrieve_chunks::{Hit, Payload};
use crate::vector_store::{StoreEntry, VectorStore};

/// Vector store backed by a Qdrant server's REST API.
pub struct QdrantStore {
    base_url: String,
    collection: String,
    distance: String,
}

#[derive(Serialize)]
struct CreateCollection<'a> {
    vectors: VectorParams<'a>,
}

#[derive(Serialize)]
struct VectorParams<'a> {
    size: usize,
    distance: &'a str,
}

#[derive(Serialize)]
struct Point<'a> {
    id: &'a str,
    vector: &'a [f32],
    payload: Payload,
}

#[derive(Serialize)]
struct UpsertPoints<'a> {
    points: &'a [Point<'a>],
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: Option<QueryResult>,
}

#[derive(Deserialize)]
struct QueryResult {
    points: Vec<Hit>,
}

#[derive(Deserialize)]
struct CountResponse {
    result: Option<CountResult>,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

impl QdrantStore {
    pub fn new(base_url: &str, collection: &str, distance: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            distance: distance.to_string(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn collection_exists(&self) -> Result<bool> {
        resource_exists(&self.collection_url())
    }

    fn ensure_collection(&self, vector_size: usize) -> Result<()> {
        if self.collection_exists()? {
            return Ok(());
        }
        info!(collection = %self.collection, vector_size, "creating qdrant collection");
        let body = CreateCollection {
            vectors: VectorParams {
                size: vector_size,
                distance: &self.distance,
            },
        };
        put_json::<Value, _>(&self.collection_url(), &body)?;
        Ok(())
    }
}

impl VectorStore for QdrantStore {
    fn add(&mut self, entries: Vec<StoreEntry>) -> Result<usize> {
        let Some(first) = entries.first() else {
            return Ok(0);
        };
        self.ensure_collection(first.vector.len())?;

        let points: Vec<Point> = entries
            .iter()
            .map(|entry| Point {
                id: &entry.id,
                vector: &entry.vector,
                payload: Payload::from(&entry.chunk),
            })
            .collect();
        // `wait=true` returns only once the points are applied, so a finished
        // ingestion is durable without a separate flush.
        let url = format!("{}/points?wait=true", self.collection_url());
        put_json::<Value, _>(&url, &UpsertPoints { points: &points })?;
        debug!(points = points.len(), "upserted points");
        Ok(points.len())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Hit>> {
        // Nothing has been ingested yet.
        if vector.is_empty() || !self.collection_exists()? {
            return Ok(vec![]);
        }
        let url = format!("{}/points/query", self.collection_url());
        let req = QueryRequest {
            query: vector,
            limit: k,
            with_payload: true,
        };
        let res = post_json::<QueryResponse, _>(&url, &req)?;
        Ok(res.result.map(|r| r.points).unwrap_or_default())
    }

    fn persist(&mut self) -> Result<()> {
        Ok(())
    }

    fn contains_source(&self, source: &str) -> Result<bool> {
        if !self.collection_exists()? {
            return Ok(false);
        }
        let url = format!("{}/points/count", self.collection_url());
        let body = json!({
            "filter": { "must": [ { "key": "source", "match": { "value": source } } ] },
            "exact": true,
        });
        let res = post_json::<CountResponse, _>(&url, &body)?;
        Ok(res.result.map(|r| r.count > 0).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Minimal Qdrant stand-in: every request gets `status` and `body`.
    /// Returns the base url and the request lines it has seen.
    fn stub_qdrant(status: &'static str, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut content_length = 0usize;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header.trim().is_empty() {
                        break;
                    }
                    let lower = header.to_ascii_lowercase();
                    if let Some(value) = lower.strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
                let mut request_body = vec![0u8; content_length];
                reader.read_exact(&mut request_body).unwrap();
                log.lock().unwrap().push(request_line.trim().to_string());

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        (base_url, seen)
    }

    #[test]
    fn query_before_any_ingestion_returns_no_hits() {
        let (base_url, seen) = stub_qdrant(
            "404 Not Found",
            r#"{"status":{"error":"Not found: Collection `it_support_chunks` doesn't exist!"}}"#,
        );
        let store = QdrantStore::new(&base_url, "it_support_chunks", "Cosine");

        assert!(!store.contains_source("a.pdf").unwrap());
        assert!(store.query(&[1.0, 0.0], 4).unwrap().is_empty());

        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|line| line.starts_with("GET /collections/it_support_chunks ")), "{seen:?}");
    }

    #[test]
    fn query_surfaces_server_errors() {
        let (base_url, _) = stub_qdrant("500 Internal Server Error", r#"{"status":{"error":"boom"}}"#);
        let store = QdrantStore::new(&base_url, "it_support_chunks", "Cosine");

        let err = store.query(&[1.0, 0.0], 4).unwrap_err();
        assert!(matches!(err, crate::error::RagError::Upstream(ref msg) if msg.contains("500")), "{err}");
    }

    #[test]
    fn query_response_decodes_points_with_partial_payloads() {
        let raw = r#"{"result":{"points":[
            {"id":"a","score":0.9,"payload":{"source":"vpn.pdf","page":2,"text":"Open the VPN client."}},
            {"id":"b","score":0.5,"payload":{"text":"orphan"}},
            {"id":"c","score":0.1}
        ]},"status":"ok"}"#;
        let res: QueryResponse = serde_json::from_str(raw).unwrap();
        let points = res.result.unwrap().points;

        assert_eq!(points.len(), 3);
        let first = points[0].payload.as_ref().unwrap();
        assert_eq!(first.source.as_deref(), Some("vpn.pdf"));
        assert_eq!(first.page, Some(2));
        assert_eq!(points[1].payload.as_ref().unwrap().source, None);
        assert!(points[2].payload.is_none());
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let store = QdrantStore::new("http://localhost:6333/", "docs", "Cosine");
        assert_eq!(store.collection_url(), "http://localhost:6333/collections/docs");
    }
}
