//! Gemini Studio: generate images from text and transform uploaded images
//! with Google's Gemini image models.
//!
//! ```rust,ignore
//! use gemini_studio::{GeminiClient, GeminiConfig, GenerationRequest, ImageStyle};
//!
//! let client = GeminiClient::configure("AIza...", GeminiConfig::from_env())?;
//! let request = GenerationRequest::new("a red barn in a field")
//!     .with_style(Some(ImageStyle::Watercolor));
//! let result = client.image().generate(&request).await;
//! ```

pub mod config;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod prompt;
pub mod session;
pub mod studio;

pub use config::{GeminiConfig, GenerationSettings};
pub use error::{Result, StudioError};
pub use gemini::{GeminiClient, GeminiTransport, HttpTransport, ImageClient};
pub use models::{
    GenerationRequest, GenerationResult, ImageDownload, ImageStyle, TransformKind,
    TransformationRequest,
};
pub use session::Session;
pub use studio::{Action, Mode, Outcome, RenderedImage, Studio};
