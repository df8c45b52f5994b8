use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{documents_from_value, RecordStore, StoredDocument};
use crate::error::StoreError;

/// Store backed by a JSON export shaped `{collection: {id: document}}`.
///
/// The file is read on every fetch so edits are picked up without a restart.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Value, StoreError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            StoreError::unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let mut root = self.load().await?;
        let snapshot = match root.as_object_mut() {
            Some(map) => map.remove(collection).unwrap_or(Value::Null),
            None => {
                return Err(StoreError::Malformed(format!(
                    "{}: top level must be an object of collections",
                    self.path.display()
                )))
            }
        };
        documents_from_value(snapshot)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        tokio::fs::metadata(&self.path)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::unavailable(format!("cannot stat {}: {e}", self.path.display())))
    }

    fn backend_name(&self) -> &'static str {
        "json_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[tokio::test]
    async fn reads_named_collection() {
        let file = write_temp(
            r#"{"embeddings": {"p2": {"name": "B"}, "p1": {"name": "A"}}, "other": {}}"#,
        );
        let store = JsonFileStore::new(file.path().to_path_buf());
        let docs = store.fetch_all("embeddings").await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn keyed_collection_keeps_file_order() {
        let file = write_temp(
            r#"{"embeddings": {"zeta": {"embedding": [1, 0]}, "alpha": {"embedding": [1, 0]}, "mid": {}}}"#,
        );
        let store = JsonFileStore::new(file.path().to_path_buf());
        let docs = store.fetch_all("embeddings").await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let file = write_temp(r#"{"other": {"x": {}}}"#);
        let store = JsonFileStore::new(file.path().to_path_buf());
        assert!(store.fetch_all("embeddings").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let store = JsonFileStore::new(PathBuf::from("/nonexistent/facematch/store.json"));
        assert!(matches!(
            store.fetch_all("embeddings").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.ping().await.is_err());
    }

    #[tokio::test]
    async fn non_object_root_is_malformed() {
        let file = write_temp("[1, 2, 3]");
        let store = JsonFileStore::new(file.path().to_path_buf());
        assert!(matches!(
            store.fetch_all("embeddings").await,
            Err(StoreError::Malformed(_))
        ));
    }
}
