//! Record store access for face matching.
//!
//! The matcher treats storage as one opaque call:
//! [`RecordStore::fetch_all`] returns every `(id, document)` pair under a
//! collection, in the backend's iteration order. Documents are arbitrary JSON;
//! interpreting them (and skipping malformed ones) is the matcher's job.
//!
//! Backends are selected through [`StoreConfig`]:
//!
//! - [`InMemoryStore`] for tests and demos.
//! - [`JsonFileStore`] for a local export of the collection.
//! - [`FirebaseStore`] for a Firebase Realtime Database over REST.

mod backend;
mod error;
mod file;
mod firebase;

pub use crate::backend::{
    documents_from_value, InMemoryStore, RecordStore, StoreConfig, StoredDocument,
};
pub use crate::error::StoreError;
pub use crate::file::JsonFileStore;
pub use crate::firebase::FirebaseStore;

/// Collection that holds enrolled face embeddings.
pub const DEFAULT_COLLECTION: &str = "embeddings";
