pub mod image_client;
pub mod staging;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use crate::{
    config::GeminiConfig,
    error::{Result, StudioError},
};

pub use image_client::ImageClient;
pub use staging::{sniff_image_type, StagedUpload};
pub use transport::{ChunkStream, GeminiTransport, HttpTransport};

#[derive(Clone)]
pub struct GeminiClient {
    image_client: ImageClient,
}

impl GeminiClient {
    /// Builds a client for `credential`. Only emptiness is checked here; the
    /// service validates the key on the first call.
    pub fn configure(credential: &str, config: GeminiConfig) -> Result<Self> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(StudioError::AuthConfigError("an API key is required".into()));
        }
        let transport = Arc::new(HttpTransport::new(credential, &config));
        log::info!("Gemini client configured for {}", config.endpoint());
        Ok(Self::with_transport(transport, config))
    }

    /// Uses the key from `config.api_key`.
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let credential = config.api_key.clone().unwrap_or_default();
        Self::configure(&credential, config)
    }

    pub fn with_transport(transport: Arc<dyn GeminiTransport>, config: GeminiConfig) -> Self {
        Self {
            image_client: ImageClient::new(transport, config),
        }
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }
}
