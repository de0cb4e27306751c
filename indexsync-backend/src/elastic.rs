//! Elasticsearch backend.
//!
//! Speaks the 1.x REST API: typed documents under `/{index}/{type}/{id}`,
//! per-type mappings, and `fields=_id` searches over comma-joined types.

use crate::backend::{
    BulkFailure, BulkSummary, SearchBackend, SearchHit, SearchQuery, SearchRequest, TypeMapping,
};
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use indexsync_model::SearchDocument;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use urlencoding::encode;

/// Connection settings for an Elasticsearch cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticConfig {
    /// Base URL of one cluster node (e.g. `http://localhost:9200`).
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Basic auth user, if the cluster requires one.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Whether TLS certificates are verified.
    pub verify_certs: bool,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            timeout_secs: 30,
            username: None,
            password: None,
            verify_certs: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_type")]
    doc_type: String,
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(rename = "_type", default)]
    doc_type: String,
    #[serde(rename = "_id", default)]
    id: String,
    status: u16,
    error: Option<Value>,
}

/// Elasticsearch implementation of [`SearchBackend`].
pub struct ElasticBackend {
    config: ElasticConfig,
    client: Client,
}

impl ElasticBackend {
    /// Creates a backend for the configured cluster.
    pub fn new(config: ElasticConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let builder = self.client.request(method, url);
        match &self.config.username {
            Some(user) => builder.basic_auth(user, self.config.password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> BackendResult<Response> {
        builder
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("{what} failed: {e}")))
    }

    async fn error_for(response: Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        BackendError::Http { status, body }
    }
}

/// `{index}/{type}/{id}` with every segment percent-encoded.
fn doc_path(index: &str, doc_type: &str, id: &str) -> String {
    format!("{}/{}/{}", encode(index), encode(doc_type), encode(id))
}

#[async_trait]
impl SearchBackend for ElasticBackend {
    async fn upsert(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        body: &Value,
    ) -> BackendResult<()> {
        debug!("Indexing {}/{}/{}", index, doc_type, id);
        let builder = self.request(Method::PUT, &doc_path(index, doc_type, id)).json(body);
        let response = self.send(builder, "index").await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }

    async fn delete(&self, index: &str, doc_type: &str, id: &str) -> BackendResult<bool> {
        debug!("Deleting {}/{}/{}", index, doc_type, id);
        let builder = self.request(Method::DELETE, &doc_path(index, doc_type, id));
        let response = self.send(builder, "delete").await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> BackendResult<Vec<SearchHit>> {
        let types: Vec<String> = request.doc_types.iter().map(|t| encode(t).into_owned()).collect();
        let path = format!("{}/{}/_search", encode(index), types.join(","));
        let mut params = vec![
            ("analyze_wildcard", request.analyze_wildcard.to_string()),
            ("fields", "_id".to_string()),
            ("from", request.offset.to_string()),
            ("size", request.limit.to_string()),
        ];

        let builder = match &request.query {
            SearchQuery::Text(q) => {
                params.push(("q", q.clone()));
                self.request(Method::GET, &path).query(&params)
            }
            SearchQuery::Structured(q) => self
                .request(Method::POST, &path)
                .query(&params)
                .json(&json!({ "query": q })),
        };

        let response = self.send(builder, "search").await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("search response: {e}")))?;

        debug!("Search on {} returned {} hits", path, parsed.hits.hits.len());
        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|h| SearchHit::new(h.doc_type, h.id))
            .collect())
    }

    async fn create_index(&self, index: &str) -> BackendResult<()> {
        let response = self.send(self.request(Method::PUT, &encode(index)), "create index").await?;
        match response.status() {
            // Index already exists.
            StatusCode::BAD_REQUEST => {
                debug!("Index {} already exists", index);
                Ok(())
            }
            status if status.is_success() => Ok(()),
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn drop_index(&self, index: &str) -> BackendResult<()> {
        let response = self.send(self.request(Method::DELETE, &encode(index)), "drop index").await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::error_for(response).await)
    }

    async fn put_mapping(&self, index: &str, mapping: &TypeMapping) -> BackendResult<()> {
        let builder = self
            .request(Method::PUT, &format!("{}/_mapping/{}", encode(index), encode(&mapping.doc_type)))
            .json(&mapping.to_json());
        let response = self.send(builder, "put mapping").await?;
        match response.status() {
            StatusCode::BAD_REQUEST => Err(BackendError::SchemaConflict {
                doc_type: mapping.doc_type.clone(),
                reason: response.text().await.unwrap_or_default(),
            }),
            status if status.is_success() => Ok(()),
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> BackendResult<BulkSummary> {
        if documents.is_empty() {
            return Ok(BulkSummary::default());
        }

        let mut payload = String::new();
        for doc in documents {
            let action = json!({
                "index": { "_index": index, "_type": doc.doc_type, "_id": doc.id.to_string() }
            });
            payload.push_str(&serde_json::to_string(&action)?);
            payload.push('\n');
            payload.push_str(&serde_json::to_string(&doc.body())?);
            payload.push('\n');
        }

        let builder = self
            .request(Method::POST, "_bulk")
            .header("Content-Type", "application/x-ndjson")
            .body(payload);
        let response = self.send(builder, "bulk").await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let parsed: BulkResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("bulk response: {e}")))?;

        let mut summary = BulkSummary::default();
        for item in parsed.items.into_iter().flat_map(HashMap::into_values) {
            if item.error.is_some() || item.status >= 300 {
                summary.failed.push(BulkFailure {
                    doc_type: item.doc_type,
                    id: item.id,
                    reason: item
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| format!("status {}", item.status)),
                });
            } else {
                summary.indexed += 1;
            }
        }
        debug!(
            "Bulk wrote {} documents to {} ({} failed)",
            summary.indexed,
            index,
            summary.failed.len()
        );
        Ok(summary)
    }
}
