use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{documents_from_value, RecordStore, StoredDocument};
use crate::error::StoreError;

/// Firebase Realtime Database accessed through its REST API.
///
/// `fetch_all("embeddings")` issues `GET {database_url}/embeddings.json`,
/// appending `?auth=<token>` when a token is configured. Errors are returned
/// as-is; there is no retry inside a request.
pub struct FirebaseStore {
    client: reqwest::Client,
    database_url: String,
    auth_token: Option<String>,
}

impl FirebaseStore {
    pub fn new(
        database_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let database_url = database_url.trim().trim_end_matches('/').to_string();
        if database_url.is_empty() {
            return Err(StoreError::Config(
                "firebase database_url must not be empty".into(),
            ));
        }
        if !(database_url.starts_with("https://") || database_url.starts_with("http://")) {
            return Err(StoreError::Config(format!(
                "firebase database_url must be an http(s) URL, got {database_url}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StoreError::Config(format!("http client init failed: {e}")))?;
        Ok(Self {
            client,
            database_url,
            auth_token: auth_token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub(crate) fn collection_url(&self, collection: &str) -> String {
        let path = collection.trim_matches('/');
        format!("{}/{}.json", self.database_url, path)
    }

    async fn get_json(&self, url: &str, shallow: bool) -> Result<Value, StoreError> {
        let mut request = self.client.get(url);
        if let Some(token) = self.auth_token.as_deref() {
            request = request.query(&[("auth", token)]);
        }
        if shallow {
            request = request.query(&[("shallow", "true")]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::unavailable(format!(
                "HTTP error {status}: {body}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Malformed(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl RecordStore for FirebaseStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let start = Instant::now();
        let url = self.collection_url(collection);
        let snapshot = match self.get_json(&url, false).await {
            Ok(value) => value,
            Err(err) => {
                warn!(collection, error = %err, "store_fetch_failure");
                return Err(err);
            }
        };
        let docs = documents_from_value(snapshot)?;
        debug!(
            collection,
            documents = docs.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "store_fetch_success"
        );
        Ok(docs)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let url = format!("{}/.json", self.database_url);
        self.get_json(&url, true).await.map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "firebase"
    }
}
