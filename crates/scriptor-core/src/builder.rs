use std::sync::Arc;

use crate::backend::{DylibBackend, ModuleBackend};
use crate::configuration::Configuration;
use crate::embedder::SerialEmbedder;
use crate::logger::Logger;

/// Assembles embedders.
///
/// The logger is installed before the configuration is applied, so it sees
/// the outcome of the initial reset.
pub struct EmbedderBuilder {
    configuration: Configuration,
    logger: Option<Arc<dyn Logger>>,
    backend: Arc<dyn ModuleBackend>,
}

impl EmbedderBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            logger: None,
            backend: Arc::new(DylibBackend),
        }
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the default dynamic-library backend.
    pub fn backend(mut self, backend: impl ModuleBackend + 'static) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    pub fn build_serial(self) -> SerialEmbedder {
        SerialEmbedder::with_backend(self.configuration, self.backend, self.logger)
    }
}
