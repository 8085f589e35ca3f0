mod models_catalog;
mod request_id;

use bytes::Bytes;

use crate::config::{AppConfig, EndpointConfig};
use crate::health::{HealthPolicy, HealthTracker, MemoryHealthStore};
use crate::routing::PathResolver;
use crate::transport::{HttpTransport, PreparedSource};

use request_id::RequestIdGenerator;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    pub resolver: PathResolver,
    sources: Vec<PreparedSource>,
    health: HealthTracker<MemoryHealthStore>,
    models_body: Bytes,
    request_ids: RequestIdGenerator,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let transport = HttpTransport::new(&config.server);
        let resolver = PathResolver::new(&config.endpoints);
        let sources = config.sources.iter().map(PreparedSource::new).collect();
        let health = HealthTracker::new(
            HealthPolicy::from_config(&config.health),
            MemoryHealthStore::default(),
        );

        Self {
            config,
            transport,
            resolver,
            sources,
            health,
            models_body: models_catalog::build_models_response_body(),
            request_ids: RequestIdGenerator::new(),
        }
    }

    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.config.endpoints.len()
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn endpoint(&self, index: usize) -> &EndpointConfig {
        &self.config.endpoints[index]
    }

    #[must_use]
    pub fn sources(&self) -> &[PreparedSource] {
        &self.sources
    }

    #[must_use]
    pub fn health(&self) -> &HealthTracker<MemoryHealthStore> {
        &self.health
    }

    #[must_use]
    pub fn models_response_body(&self) -> Bytes {
        self.models_body.clone()
    }

    /// Synthesize a compat-dialect completion id.
    #[must_use]
    pub fn next_chat_id(&self) -> String {
        self.request_ids.next_chat_id()
    }

    /// Per-request correlation id surfaced on every response.
    #[must_use]
    pub fn next_request_id(&self) -> uuid::Uuid {
        self.request_ids.next_request_uuid()
    }
}
