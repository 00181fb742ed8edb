//! HTTP client wrapper for interacting with Qdrant.

use crate::qdrant::{
    payload::{CHUNK_ID_KEY, NOTE_ID_KEY, build_payload, current_timestamp_rfc3339, parse_owner_ids},
    types::{QdrantError, QueryResponse, QueryResponseResult, ScoredPoint},
};
use crate::vector::{VectorHit, VectorRecord, VectorStore, VectorStoreError};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

/// Lightweight HTTP client bound to one Qdrant collection.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) collection: String,
}

impl QdrantService {
    /// Construct a new client for `collection` on the Qdrant instance at `url`.
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(
        url: &str,
        collection: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, QdrantError> {
        let client = Client::builder()
            .user_agent("semnotes/0.1")
            .timeout(timeout)
            .build()?;

        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            collection,
            has_api_key = %api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            collection: collection.to_string(),
        })
    }

    /// Create the collection when missing and ensure the owner-id payload indexes exist.
    pub async fn ensure_collection(&self, vector_size: u64) -> Result<(), QdrantError> {
        if !self.collection_exists().await? {
            tracing::debug!(
                collection = %self.collection,
                vector_size,
                "Creating collection"
            );
            self.create_collection(vector_size).await?;
        }
        self.ensure_payload_indexes().await
    }

    /// Create or update the collection with the specified vector size.
    pub async fn create_collection(&self, vector_size: u64) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, "Collection ensured/created");
        })
        .await
    }

    /// Upload one chunk vector tagged with its owning note and chunk ids.
    pub async fn upsert_point(&self, record: &VectorRecord) -> Result<(), QdrantError> {
        let now = current_timestamp_rfc3339();
        let point = json!({
            "id": record.chunk_id.to_string(),
            "vector": record.vector,
            "payload": build_payload(record.note_id, record.chunk_id, &now),
        });

        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/points", self.collection),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": [point] }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = %self.collection,
                note_id = %record.note_id,
                chunk_id = %record.chunk_id,
                "Point upserted"
            );
        })
        .await
    }

    /// Perform a similarity search, returning scored payloads.
    pub async fn search_points(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.collection),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    /// Delete every point whose payload `note_id` matches.
    pub async fn delete_note_points(&self, note_id: Uuid) -> Result<(), QdrantError> {
        let body = json!({
            "filter": {
                "must": [
                    {
                        "key": NOTE_ID_KEY,
                        "match": { "value": note_id.to_string() }
                    }
                ]
            }
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/delete", self.collection),
            )?
            .query(&[("wait", true)])
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, %note_id, "Note points deleted");
        })
        .await
    }

    /// Ensure keyword payload indexes exist for the owner-id fields.
    pub async fn ensure_payload_indexes(&self) -> Result<(), QdrantError> {
        for field in [NOTE_ID_KEY, CHUNK_ID_KEY] {
            let body = json!({
                "field_name": field,
                "field_schema": "keyword",
            });

            let response = self
                .request(
                    Method::PUT,
                    &format!("collections/{}/index", self.collection),
                )?
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() {
                tracing::debug!(collection = %self.collection, field, "Payload index ensured");
            } else if response.status() == StatusCode::CONFLICT {
                tracing::debug!(collection = %self.collection, field, "Payload index already exists");
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::warn!(collection = %self.collection, field, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorStore for QdrantService {
    async fn upsert(&self, record: VectorRecord) -> Result<(), VectorStoreError> {
        self.upsert_point(&record).await.map_err(VectorStoreError::from)
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, VectorStoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let points = self.search_points(vector, top_k).await?;
        let hits = points
            .into_iter()
            .filter_map(|point| {
                let owners = point.payload.as_ref().and_then(parse_owner_ids);
                match owners {
                    Some((chunk_id, note_id)) => Some(VectorHit {
                        chunk_id,
                        note_id,
                        score: point.score,
                    }),
                    None => {
                        tracing::warn!(point_id = %point.id, "Skipping point without note/chunk payload");
                        None
                    }
                }
            })
            .collect();
        Ok(hits)
    }

    async fn delete_by_note(&self, note_id: Uuid) -> Result<(), VectorStoreError> {
        self.delete_note_points(note_id)
            .await
            .map_err(VectorStoreError::from)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };

    fn service_for(server: &MockServer) -> QdrantService {
        QdrantService::new(
            &server.base_url(),
            "notes",
            Some("secret".into()),
            Duration::from_secs(5),
        )
        .expect("service")
    }

    #[tokio::test]
    async fn hung_request_fails_with_timeout() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/notes");
                then.status(200).delay(Duration::from_secs(5));
            })
            .await;

        let service = QdrantService::new(
            &server.base_url(),
            "notes",
            None,
            Duration::from_millis(100),
        )
        .expect("service");
        let started = std::time::Instant::now();
        let error = service.ensure_collection(4).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(3));
        match error {
            QdrantError::Http(source) => assert!(source.is_timeout()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn search_maps_payload_tags_to_hits() {
        let server = MockServer::start_async().await;
        let note_id = Uuid::new_v4();
        let chunk_id = Uuid::new_v4();

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/notes/points/query")
                    .header("api-key", "secret")
                    .json_body_partial(r#"{ "limit": 6, "with_payload": true }"#);
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": chunk_id.to_string(),
                                "score": 0.82,
                                "payload": {
                                    "note_id": note_id.to_string(),
                                    "chunk_id": chunk_id.to_string()
                                }
                            },
                            {
                                "id": 7,
                                "score": 0.5,
                                "payload": { "text": "legacy point" }
                            }
                        ]
                    }
                }));
            })
            .await;

        let service = service_for(&server);
        let hits = VectorStore::search(&service, &[0.1, 0.2], 6)
            .await
            .expect("search request");

        mock.assert_async().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].note_id, note_id);
        assert_eq!(hits[0].chunk_id, chunk_id);
        assert!((hits[0].score - 0.82).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn upsert_sends_point_with_owner_payload() {
        let server = MockServer::start_async().await;
        let note_id = Uuid::new_v4();
        let chunk_id = Uuid::new_v4();

        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/notes/points")
                    .query_param("wait", "true")
                    .body_contains(note_id.to_string())
                    .body_contains(chunk_id.to_string());
                then.status(200).json_body(json!({
                    "status": "ok",
                    "result": { "operation_id": 1, "status": "completed" }
                }));
            })
            .await;

        let service = service_for(&server);
        service
            .upsert(VectorRecord {
                chunk_id,
                note_id,
                vector: vec![0.5, 0.5],
            })
            .await
            .expect("upsert");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_by_note_filters_on_note_id() {
        let server = MockServer::start_async().await;
        let note_id = Uuid::new_v4();

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/notes/points/delete")
                    .body_contains(note_id.to_string());
                then.status(200).json_body(json!({ "status": "ok", "result": {} }));
            })
            .await;

        let service = service_for(&server);
        service.delete_by_note(note_id).await.expect("delete");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unexpected_status_surfaces_as_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/notes/points/delete");
                then.status(503).body("unavailable");
            })
            .await;

        let service = service_for(&server);
        let error = service.delete_by_note(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(
            error,
            VectorStoreError::Qdrant(QdrantError::UnexpectedStatus { status, .. })
                if status == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn ensure_collection_creates_missing_collection() {
        let server = MockServer::start_async().await;
        let exists = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/notes");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/notes")
                    .json_body_partial(r#"{ "vectors": { "size": 4, "distance": "Cosine" } }"#);
                then.status(200).json_body(json!({ "status": "ok", "result": true }));
            })
            .await;
        let index = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/notes/index");
                then.status(200).json_body(json!({ "status": "ok", "result": {} }));
            })
            .await;

        let service = service_for(&server);
        service.ensure_collection(4).await.expect("ensure collection");

        exists.assert_async().await;
        create.assert_async().await;
        index.assert_hits_async(2).await;
    }
}
