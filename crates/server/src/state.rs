use crate::config::ServerConfig;
use crate::telemetry::install_prometheus;
use embedding::FaceDetector;
use matcher::MatchService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use store::RecordStore;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Match service with the detector and store handles built at startup
    pub service: MatchService,

    /// Prometheus handle when metrics are enabled
    pub prometheus: Option<PrometheusHandle>,
}

impl ServerState {
    /// Build the detector and store from configuration. Misconfiguration
    /// fails here, before the listener binds.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let detector = config.pipeline.build_detector()?;
        let store = config.pipeline.build_store()?;
        Self::with_components(config, detector, store)
    }

    /// Build state around caller-supplied collaborators.
    pub fn with_components(
        config: ServerConfig,
        detector: Arc<dyn FaceDetector>,
        store: Arc<dyn RecordStore>,
    ) -> anyhow::Result<Self> {
        let service = config.pipeline.build_match_service_with(detector, store)?;
        let prometheus = if config.metrics_enabled {
            Some(install_prometheus()?)
        } else {
            None
        };

        tracing::info!(
            detector = service.pipeline().detector().model_name(),
            store = service.store().backend_name(),
            collection = %service.config().collection,
            default_threshold = service.config().default_threshold,
            "server_state_ready"
        );

        Ok(Self {
            config: Arc::new(config),
            service,
            prometheus,
        })
    }

    pub fn model_name(&self) -> &str {
        self.service.pipeline().detector().model_name()
    }

    pub fn embedding_dimension(&self) -> usize {
        self.service.config().dimension
    }
}
