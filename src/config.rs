//! YAML configuration for the face matching pipeline.
//!
//! One file describes the detector, the matcher and the record store, and
//! can build each of them:
//!
//! ```yaml
//! version: "1.0"
//! name: "lost-and-found"
//!
//! embedding:
//!   detector: "http"
//!   model_name: "buffalo_l"
//!   detector_url: "http://127.0.0.1:9000/detect"
//!   timeout_secs: 20
//!
//! matcher:
//!   default_threshold: 0.55
//!   top_k: 5
//!   collection: "embeddings"
//!
//! store:
//!   backend: "firebase"
//!   database_url: "https://my-project.firebaseio.com"
//!   auth_token: "secret"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use embedding::{
    DetectionError, EmbeddingPipeline, FaceDetector, HttpFaceDetector, StubFaceDetector,
    EMBEDDING_DIM,
};
use matcher::{MatchConfig, MatchService, ServiceError, DEFAULT_THRESHOLD, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use store::{RecordStore, StoreConfig, StoreError, DEFAULT_COLLECTION};
use thiserror::Error;

const DEFAULT_MODEL_NAME: &str = "buffalo_l";

/// Errors raised while loading a configuration or building from it.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("detector setup failed: {0}")]
    Detector(#[from] DetectionError),

    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("match service setup failed: {0}")]
    Service(#[from] ServiceError),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FacematchConfig {
    /// Configuration format version
    #[serde(default = "default_config_version")]
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub embedding: EmbeddingYamlConfig,

    #[serde(default)]
    pub matcher: MatchYamlConfig,

    #[serde(default)]
    pub store: StoreYamlConfig,
}

impl FacematchConfig {
    /// Load and validate a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FacematchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Stub detector and empty in-memory store, for tests and demos.
    pub fn local() -> Self {
        let mut config = Self::default();
        config.embedding.detector = "stub".to_string();
        config.store.backend = "in_memory".to_string();
        config
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.matcher.validate()?;
        self.store.validate()?;
        self.embedding.validate()?;
        Ok(())
    }

    pub fn to_match_config(&self) -> MatchConfig {
        MatchConfig {
            default_threshold: self.matcher.default_threshold,
            top_k: self.matcher.top_k,
            collection: self.matcher.collection.clone(),
            dimension: self.embedding.dimension,
            timeout_ms: self.matcher.timeout_ms,
        }
    }

    pub fn to_store_config(&self) -> Result<StoreConfig, ConfigLoadError> {
        self.store.to_store_config()
    }

    /// Build the configured face detector.
    pub fn build_detector(&self) -> Result<Arc<dyn FaceDetector>, ConfigLoadError> {
        let cfg = &self.embedding;
        match cfg.detector.as_str() {
            "stub" => Ok(Arc::new(
                StubFaceDetector::with_dimension(cfg.dimension).with_model_name(cfg.model_name()),
            )),
            "http" => {
                let url = cfg
                    .detector_url
                    .as_deref()
                    .ok_or_else(|| ConfigLoadError::MissingField("embedding.detector_url".into()))?;
                Ok(Arc::new(HttpFaceDetector::new(
                    url,
                    cfg.model_name(),
                    Duration::from_secs(cfg.timeout_secs),
                )?))
            }
            other => Err(ConfigLoadError::Validation(format!(
                "unknown detector '{other}'"
            ))),
        }
    }

    pub fn build_store(&self) -> Result<Arc<dyn RecordStore>, ConfigLoadError> {
        Ok(self.to_store_config()?.build()?)
    }

    /// Build a ready [`MatchService`] from this configuration.
    pub fn build_match_service(&self) -> Result<MatchService, ConfigLoadError> {
        self.build_match_service_with(self.build_detector()?, self.build_store()?)
    }

    /// Same as [`build_match_service`](Self::build_match_service) but with
    /// caller-supplied collaborators.
    pub fn build_match_service_with(
        &self,
        detector: Arc<dyn FaceDetector>,
        store: Arc<dyn RecordStore>,
    ) -> Result<MatchService, ConfigLoadError> {
        let pipeline = EmbeddingPipeline::with_dimension(detector, self.embedding.dimension);
        Ok(MatchService::new(pipeline, store, self.to_match_config())?)
    }
}

impl Default for FacematchConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            name: None,
            embedding: EmbeddingYamlConfig::default(),
            matcher: MatchYamlConfig::default(),
            store: StoreYamlConfig::default(),
        }
    }
}

/// Detector and embedding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingYamlConfig {
    /// `http` (default) or `stub`
    #[serde(default = "default_detector")]
    pub detector: String,

    /// Reported model name; unset picks one from the detector kind.
    #[serde(default)]
    pub model_name: Option<String>,

    /// Inference sidecar endpoint, required for the `http` detector.
    #[serde(default)]
    pub detector_url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl EmbeddingYamlConfig {
    /// The configured model name, or `stub` for the stub detector and
    /// `buffalo_l` for the sidecar.
    pub fn model_name(&self) -> &str {
        match (&self.model_name, self.detector.as_str()) {
            (Some(name), _) => name.as_str(),
            (None, "stub") => "stub",
            (None, _) => DEFAULT_MODEL_NAME,
        }
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_detectors = ["stub", "http"];
        if !valid_detectors.contains(&self.detector.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "embedding.detector must be one of: {valid_detectors:?}"
            )));
        }
        if self.detector == "http" && self.detector_url.is_none() {
            return Err(ConfigLoadError::Validation(
                "embedding.detector_url is required when detector is 'http'".to_string(),
            ));
        }
        if self.dimension == 0 {
            return Err(ConfigLoadError::Validation(
                "embedding.dimension must be >= 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "embedding.timeout_secs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EmbeddingYamlConfig {
    fn default() -> Self {
        Self {
            detector: default_detector(),
            model_name: None,
            detector_url: None,
            timeout_secs: default_timeout_secs(),
            dimension: default_dimension(),
        }
    }
}

/// Matcher YAML configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchYamlConfig {
    #[serde(default = "default_threshold")]
    pub default_threshold: f32,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl MatchYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !(0.0..=1.0).contains(&self.default_threshold) {
            return Err(ConfigLoadError::Validation(
                "matcher.default_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(ConfigLoadError::Validation(
                "matcher.top_k must be >= 1".to_string(),
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "matcher.collection must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchYamlConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            collection: default_collection(),
            timeout_ms: None,
        }
    }
}

/// Record store YAML configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreYamlConfig {
    /// `firebase` (default), `json_file` or `in_memory`
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["in_memory", "json_file", "firebase"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.backend must be one of: {valid_backends:?}"
            )));
        }
        if self.backend == "json_file" && self.path.is_none() {
            return Err(ConfigLoadError::Validation(
                "store.path is required when backend is 'json_file'".to_string(),
            ));
        }
        if self.backend == "firebase" && self.database_url.is_none() {
            return Err(ConfigLoadError::Validation(
                "store.database_url is required when backend is 'firebase'".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "store.timeout_secs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_store_config(&self) -> Result<StoreConfig, ConfigLoadError> {
        match self.backend.as_str() {
            "in_memory" => Ok(StoreConfig::in_memory()),
            "json_file" => {
                let path = self
                    .path
                    .clone()
                    .ok_or_else(|| ConfigLoadError::MissingField("store.path".into()))?;
                Ok(StoreConfig::json_file(path))
            }
            "firebase" => {
                let database_url = self
                    .database_url
                    .clone()
                    .ok_or_else(|| ConfigLoadError::MissingField("store.database_url".into()))?;
                Ok(StoreConfig::Firebase {
                    database_url,
                    auth_token: self.auth_token.clone(),
                    timeout: Duration::from_secs(self.timeout_secs),
                })
            }
            other => Err(ConfigLoadError::Validation(format!(
                "unknown store backend '{other}'"
            ))),
        }
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
            database_url: None,
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Helper functions for serde defaults
fn default_config_version() -> String {
    "1.0".to_string()
}
fn default_detector() -> String {
    "http".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_dimension() -> usize {
    EMBEDDING_DIM
}
fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}
fn default_store_backend() -> String {
    "firebase".to_string()
}
