use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::file::JsonFileStore;
use crate::firebase::FirebaseStore;

/// One document as returned by the store, keyed by its record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    /// Arbitrary-shaped document body; may or may not hold a usable embedding.
    pub document: Value,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, document: Value) -> Self {
        Self {
            id: id.into(),
            document,
        }
    }
}

/// Read-only access to an external document store.
///
/// Handles are built once at startup and shared by every request, so
/// implementations must tolerate concurrent reads.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every document under `collection`, in the store's iteration order.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;

    /// Cheap reachability probe used by readiness checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Short backend label for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Flatten a collection snapshot into ordered documents.
///
/// Objects yield one document per key. Arrays (how Firebase renders
/// integer-keyed collections) use the index as id and drop `null` holes.
/// `null` itself is an empty collection.
pub fn documents_from_value(value: Value) -> Result<Vec<StoredDocument>, StoreError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(id, document)| StoredDocument { id, document })
            .collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, doc)| !doc.is_null())
            .map(|(idx, document)| StoredDocument {
                id: idx.to_string(),
                document,
            })
            .collect()),
        other => Err(StoreError::Malformed(format!(
            "expected an object of documents, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Configuration for selecting and building a store backend.
///
/// # Example
/// ```
/// use store::StoreConfig;
///
/// // In-memory (for tests and demos)
/// let config = StoreConfig::in_memory();
///
/// // Firebase Realtime Database over REST
/// let config = StoreConfig::firebase("https://example.firebaseio.com", None);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum StoreConfig {
    /// Process-local map, empty at startup.
    #[default]
    InMemory,
    /// A JSON file shaped `{collection: {id: document}}`, re-read on every fetch.
    JsonFile { path: PathBuf },
    /// Firebase Realtime Database REST API.
    Firebase {
        database_url: String,
        auth_token: Option<String>,
        timeout: Duration,
    },
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        StoreConfig::InMemory
    }

    pub fn json_file<P: Into<PathBuf>>(path: P) -> Self {
        StoreConfig::JsonFile { path: path.into() }
    }

    pub fn firebase<S: Into<String>>(database_url: S, auth_token: Option<String>) -> Self {
        StoreConfig::Firebase {
            database_url: database_url.into(),
            auth_token,
            timeout: Duration::from_secs(30),
        }
    }

    /// Build the backend. Fails on incomplete configuration so the process
    /// stops before serving requests.
    pub fn build(&self) -> Result<Arc<dyn RecordStore>, StoreError> {
        match self {
            StoreConfig::InMemory => Ok(Arc::new(InMemoryStore::new())),
            StoreConfig::JsonFile { path } => Ok(Arc::new(JsonFileStore::new(path.clone()))),
            StoreConfig::Firebase {
                database_url,
                auth_token,
                timeout,
            } => Ok(Arc::new(FirebaseStore::new(
                database_url,
                auth_token.clone(),
                *timeout,
            )?)),
        }
    }
}

/// An in-memory store using a `RwLock` around per-collection document lists.
/// Insertion order is the iteration order.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document. Replacing keeps the original position.
    pub fn insert(&self, collection: &str, id: impl Into<String>, document: Value) {
        let id = id.into();
        let mut guard = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let docs = guard.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.document = document,
            None => docs.push(StoredDocument { id, document }),
        }
    }

    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let mut guard = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.get_mut(collection) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|d| d.id != id);
                docs.len() != before
            }
            None => false,
        }
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let guard = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.get(collection).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
