//! Command/response handling for one user session.
//!
//! Every user action is an [`Action`]; handling it yields exactly one
//! [`Outcome`] for the presentation layer to render.

use std::fmt;
use std::sync::Arc;

use crate::{
    config::GeminiConfig,
    error::{Result, StudioError},
    gemini::GeminiClient,
    models::{GenerationRequest, GenerationResult, ImageDownload, ImageStyle, TransformationRequest},
    session::Session,
};

pub const EXAMPLE_PROMPTS: [&str; 5] = [
    "A futuristic city with flying cars and glowing neon signs, twilight",
    "A cozy coffee shop interior with wooden elements, books, and plants, warm lighting",
    "An underwater scene with colorful coral reefs and tropical fish",
    "A fantasy landscape with floating islands and waterfalls flowing between them",
    "A cyberpunk portrait of a person with neon lights and advanced technology",
];

pub const EXAMPLE_TRANSFORMS: [&str; 5] = [
    "Convert to pixel art style",
    "Make it look like an oil painting",
    "Change to night time with moonlight",
    "Add a cyberpunk aesthetic with neon lights",
    "Transform into a sketch with pencil shading",
];

const GENERATION_FAILED: &str =
    "Failed to generate image. Please try a different prompt or check your API key.";
const TRANSFORMATION_FAILED: &str =
    "Failed to transform image. Please try a different prompt or check your API key.";
const NO_IMAGE: &str = "No image was generated. Please try a different prompt.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Generation,
    Transformation,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Generation => "Image Generation",
            Mode::Transformation => "Image Transformation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generate" | "generation" | "image generation" | "gen" => Some(Mode::Generation),
            "transform" | "transformation" | "image transformation" | "edit" => {
                Some(Mode::Transformation)
            }
            _ => None,
        }
    }

    pub fn examples(&self) -> &'static [&'static str] {
        match self {
            Mode::Generation => &EXAMPLE_PROMPTS,
            Mode::Transformation => &EXAMPLE_TRANSFORMS,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    SaveCredential(String),
    ResetCredential,
    Generate(GenerationRequest),
    Transform(TransformationRequest),
    /// Zero-based index into the mode's example list.
    SelectExample { mode: Mode, index: usize },
    /// Generates from the selected example with the current style and
    /// temperature. Any negative prompt is left out.
    UseGenerationExample {
        style: Option<ImageStyle>,
        temperature: f32,
    },
    /// Sends the selected example as the raw instruction, with no template.
    UseTransformationExample {
        source_image: Vec<u8>,
        temperature: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub mode: Mode,
    pub bytes: Vec<u8>,
    pub commentary: Option<String>,
    pub download: ImageDownload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    CredentialSaved,
    CredentialCleared,
    ExampleSelected(String),
    Image(RenderedImage),
    Warning {
        message: String,
        details: Option<String>,
    },
    Error {
        message: String,
        details: Option<String>,
    },
}

impl Outcome {
    fn warning(message: impl Into<String>) -> Self {
        Outcome::Warning {
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>, details: Option<String>) -> Self {
        Outcome::Error {
            message: message.into(),
            details,
        }
    }
}

/// Builds a client for a credential. Swappable so other transports can be
/// plugged in.
pub type Connector = Arc<dyn Fn(&str, &GeminiConfig) -> Result<GeminiClient> + Send + Sync>;

pub struct Studio {
    config: GeminiConfig,
    session: Session,
    client: Option<GeminiClient>,
    connector: Connector,
}

impl Studio {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_connector(
            config,
            Arc::new(|credential: &str, config: &GeminiConfig| {
                GeminiClient::configure(credential, config.clone())
            }),
        )
    }

    pub fn with_connector(config: GeminiConfig, connector: Connector) -> Self {
        Self {
            config,
            session: Session::new(),
            client: None,
            connector,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub async fn handle(&mut self, action: Action) -> Outcome {
        match action {
            Action::SaveCredential(credential) => self.save_credential(&credential),
            Action::ResetCredential => self.reset(),
            Action::SelectExample { mode, index } => self.select_example(mode, index),
            Action::Generate(request) => self.generate(request).await,
            Action::Transform(request) => self.transform(request).await,
            Action::UseGenerationExample { style, temperature } => {
                match self.session.example_for(Mode::Generation).map(String::from) {
                    Some(example) => {
                        let request = GenerationRequest::new(example)
                            .with_style(style)
                            .with_temperature(temperature);
                        self.generate(request).await
                    }
                    None => Outcome::warning("Pick an example first."),
                }
            }
            Action::UseTransformationExample {
                source_image,
                temperature,
            } => match self
                .session
                .example_for(Mode::Transformation)
                .map(String::from)
            {
                Some(example) => {
                    self.transform_raw(&source_image, &example, temperature)
                        .await
                }
                None => Outcome::warning("Pick an example first."),
            },
        }
    }

    fn save_credential(&mut self, credential: &str) -> Outcome {
        let credential = credential.trim();
        if credential.is_empty() {
            // an empty entry leaves a saved key alone
            return Outcome::error("Please enter an API key.", None);
        }
        let connected = self
            .session
            .set(credential)
            .and_then(|()| (self.connector)(credential, &self.config));
        match connected {
            Ok(client) => {
                self.client = Some(client);
                log::info!("API key saved for this session");
                Outcome::CredentialSaved
            }
            Err(e) => {
                self.session.clear();
                self.client = None;
                match e {
                    StudioError::AuthConfigError(message) => Outcome::error(message, None),
                    other => Outcome::error("Error saving API key.", Some(other.to_string())),
                }
            }
        }
    }

    fn reset(&mut self) -> Outcome {
        self.session.clear();
        self.client = None;
        log::info!("API key cleared");
        Outcome::CredentialCleared
    }

    fn select_example(&mut self, mode: Mode, index: usize) -> Outcome {
        match mode.examples().get(index) {
            Some(example) => {
                self.session.select_example(mode, *example);
                Outcome::ExampleSelected(example.to_string())
            }
            None => Outcome::warning(format!(
                "There is no example {}; pick 1 to {}.",
                index + 1,
                mode.examples().len()
            )),
        }
    }

    fn client(&self) -> Result<&GeminiClient> {
        match (&self.client, self.session.is_configured()) {
            (Some(client), true) => Ok(client),
            _ => Err(StudioError::AuthConfigError(
                "Enter your Google API key to get started.".to_string(),
            )),
        }
    }

    async fn generate(&mut self, request: GenerationRequest) -> Outcome {
        if request.prompt.trim().is_empty() {
            return Outcome::warning("Please enter a prompt to generate an image.");
        }
        let result = match self.client() {
            Ok(client) => client.image().try_generate(&request).await,
            Err(e) => Err(e),
        };
        self.render(Mode::Generation, result)
    }

    async fn transform(&mut self, request: TransformationRequest) -> Outcome {
        if request.instruction.trim().is_empty() {
            return Outcome::warning("Please enter a transformation prompt.");
        }
        let result = match self.client() {
            Ok(client) => client.image().try_transform(&request).await,
            Err(e) => Err(e),
        };
        self.render(Mode::Transformation, result)
    }

    async fn transform_raw(
        &mut self,
        source_image: &[u8],
        instruction: &str,
        temperature: f32,
    ) -> Outcome {
        let result = match self.client() {
            Ok(client) => {
                client
                    .image()
                    .try_transform_image(source_image, instruction, temperature)
                    .await
            }
            Err(e) => Err(e),
        };
        self.render(Mode::Transformation, result)
    }

    fn render(&mut self, mode: Mode, result: Result<GenerationResult>) -> Outcome {
        let failed = match mode {
            Mode::Generation => GENERATION_FAILED,
            Mode::Transformation => TRANSFORMATION_FAILED,
        };

        match result.and_then(GenerationResult::require_image) {
            Ok((bytes, commentary)) => Outcome::Image(RenderedImage {
                mode,
                bytes,
                commentary: (!commentary.trim().is_empty()).then_some(commentary),
                download: ImageDownload::default(),
            }),
            Err(StudioError::EmptyResultWarning(commentary)) => Outcome::Warning {
                message: NO_IMAGE.to_string(),
                details: Some(commentary),
            },
            Err(e @ StudioError::AuthConfigError(_)) => {
                if self.session.is_configured() {
                    // the service refused the key: make the user enter a new one
                    log::warn!("Clearing rejected API key");
                    self.session.clear();
                    self.client = None;
                }
                Outcome::error(failed, Some(e.to_string()))
            }
            Err(e) => {
                log::error!("{} failed: {}", mode, e);
                Outcome::error(failed, Some(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::mock::MockTransport;
    use crate::gemini::staging::fixtures::PNG_BYTES;
    use crate::models::{GenerateContentResponse, TransformKind};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use tempfile::TempDir;

    fn studio_with(mock: &Arc<MockTransport>, staging: &TempDir) -> Studio {
        let mock = mock.clone();
        let config = GeminiConfig::new().with_staging_dir(staging.path());
        Studio::with_connector(
            config,
            Arc::new(move |_credential: &str, config: &GeminiConfig| {
                Ok(GeminiClient::with_transport(mock.clone(), config.clone()))
            }),
        )
    }

    async fn signed_in(mock: &Arc<MockTransport>, staging: &TempDir) -> Studio {
        let mut studio = studio_with(mock, staging);
        assert_eq!(
            studio.handle(Action::SaveCredential("AIza-test".into())).await,
            Outcome::CredentialSaved
        );
        studio
    }

    fn image_chunk(bytes: &[u8]) -> GenerateContentResponse {
        GenerateContentResponse::image_chunk("image/png", STANDARD.encode(bytes))
    }

    #[tokio::test]
    async fn test_actions_require_a_saved_key() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        let mut studio = studio_with(&mock, &staging);

        let outcome = studio
            .handle(Action::Generate(GenerationRequest::new("a red barn")))
            .await;
        assert_eq!(
            outcome,
            Outcome::Error {
                message: GENERATION_FAILED.into(),
                details: Some(
                    "Authentication error: Enter your Google API key to get started.".into()
                ),
            }
        );
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_key_is_refused() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        let mut studio = studio_with(&mock, &staging);

        let outcome = studio.handle(Action::SaveCredential("  ".into())).await;
        assert_eq!(outcome, Outcome::error("Please enter an API key.", None));
        assert!(!studio.session().is_configured());
    }

    #[tokio::test]
    async fn test_generate_renders_image_and_comments() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        mock.push_chunks(vec![
            image_chunk(b"barn"),
            GenerateContentResponse::text_chunk("A barn at dawn."),
        ]);
        let mut studio = signed_in(&mock, &staging).await;

        let request = GenerationRequest::new("a red barn")
            .with_style(Some(ImageStyle::Sketch))
            .with_negative_prompt(Some("fog".into()));
        let outcome = studio.handle(Action::Generate(request)).await;

        assert_eq!(
            outcome,
            Outcome::Image(RenderedImage {
                mode: Mode::Generation,
                bytes: b"barn".to_vec(),
                commentary: Some("A barn at dawn.".into()),
                download: ImageDownload {
                    file_name: "gemini_image.jpg",
                    media_type: "image/jpeg",
                },
            })
        );
        assert_eq!(
            mock.requests()[0].1.texts(),
            vec!["a red barn, in the style of Sketch. Avoid: fog"]
        );
    }

    #[tokio::test]
    async fn test_blank_prompt_is_a_warning_without_a_call() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        let mut studio = signed_in(&mock, &staging).await;

        let outcome = studio
            .handle(Action::Generate(GenerationRequest::new("   ")))
            .await;
        assert_eq!(
            outcome,
            Outcome::warning("Please enter a prompt to generate an image.")
        );

        let outcome = studio
            .handle(Action::Transform(TransformationRequest::new(
                PNG_BYTES.to_vec(),
                "",
            )))
            .await;
        assert_eq!(outcome, Outcome::warning("Please enter a transformation prompt."));
        assert!(mock.requests().is_empty());
        assert!(mock.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_no_image_is_a_warning_not_an_error() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        mock.push_chunks(vec![GenerateContentResponse::text_chunk(
            "I can't help with that.",
        )]);
        let mut studio = signed_in(&mock, &staging).await;

        let outcome = studio
            .handle(Action::Generate(GenerationRequest::new("something odd")))
            .await;
        assert_eq!(
            outcome,
            Outcome::Warning {
                message: NO_IMAGE.into(),
                details: Some("I can't help with that.".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_remote_failure_is_reported_with_description() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        let fault = StudioError::RemoteCallError("connection reset by peer".into());
        mock.push_failure(fault.clone());
        let mut studio = signed_in(&mock, &staging).await;

        let outcome = studio
            .handle(Action::Generate(GenerationRequest::new("a red barn")))
            .await;
        assert_eq!(
            outcome,
            Outcome::error(GENERATION_FAILED, Some(fault.to_string()))
        );
        assert!(studio.session().is_configured());
    }

    #[tokio::test]
    async fn test_rejected_key_clears_session() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        mock.push_failure(StudioError::AuthConfigError("the API key was rejected".into()));
        let mut studio = signed_in(&mock, &staging).await;

        let outcome = studio
            .handle(Action::Generate(GenerationRequest::new("a red barn")))
            .await;
        assert!(matches!(outcome, Outcome::Error { .. }));
        assert!(!studio.session().is_configured());
    }

    #[tokio::test]
    async fn test_transform_uses_kind_template() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        mock.push_chunks(vec![image_chunk(b"cubist")]);
        let mut studio = signed_in(&mock, &staging).await;

        let request = TransformationRequest::new(PNG_BYTES.to_vec(), "apply cubism")
            .with_kind(TransformKind::StyleTransfer)
            .with_preservation_strength(30);
        let outcome = studio.handle(Action::Transform(request)).await;

        assert!(matches!(
            outcome,
            Outcome::Image(RenderedImage { mode: Mode::Transformation, commentary: None, .. })
        ));
        assert_eq!(
            mock.requests()[0].1.texts(),
            vec!["Transform this image: Apply this style to the image: apply cubism. Preserve approximately 30% of the original content."]
        );
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_examples() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        mock.push_chunks(vec![image_chunk(b"city")]);
        mock.push_chunks(vec![image_chunk(b"pixels")]);
        let mut studio = signed_in(&mock, &staging).await;

        let outcome = studio
            .handle(Action::UseGenerationExample {
                style: None,
                temperature: 0.5,
            })
            .await;
        assert_eq!(outcome, Outcome::warning("Pick an example first."));

        let outcome = studio
            .handle(Action::SelectExample {
                mode: Mode::Generation,
                index: 0,
            })
            .await;
        assert_eq!(outcome, Outcome::ExampleSelected(EXAMPLE_PROMPTS[0].into()));
        assert_eq!(studio.session().last_example_selection(), Some(EXAMPLE_PROMPTS[0]));

        studio
            .handle(Action::UseGenerationExample {
                style: Some(ImageStyle::Anime),
                temperature: 0.5,
            })
            .await;
        assert_eq!(
            mock.requests()[0].1.texts(),
            vec![format!("{}, in the style of Anime", EXAMPLE_PROMPTS[0])]
        );

        studio
            .handle(Action::SelectExample {
                mode: Mode::Transformation,
                index: 0,
            })
            .await;
        let outcome = studio
            .handle(Action::UseTransformationExample {
                source_image: PNG_BYTES.to_vec(),
                temperature: 0.5,
            })
            .await;
        assert!(matches!(outcome, Outcome::Image(_)));
        assert_eq!(
            mock.requests()[1].1.texts(),
            vec!["Transform this image: Convert to pixel art style"]
        );

        let outcome = studio
            .handle(Action::SelectExample {
                mode: Mode::Transformation,
                index: 5,
            })
            .await;
        assert!(matches!(outcome, Outcome::Warning { .. }));
    }

    #[tokio::test]
    async fn test_reset_forgets_everything() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        let mut studio = signed_in(&mock, &staging).await;
        studio
            .handle(Action::SelectExample {
                mode: Mode::Generation,
                index: 2,
            })
            .await;

        assert_eq!(
            studio.handle(Action::ResetCredential).await,
            Outcome::CredentialCleared
        );
        assert!(!studio.session().is_configured());
        assert_eq!(studio.session().last_example_selection(), None);
    }

    #[tokio::test]
    async fn test_generation_example_is_not_used_for_transformation() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        mock.push_chunks(vec![image_chunk(b"pixels")]);
        let mut studio = signed_in(&mock, &staging).await;
        studio
            .handle(Action::SelectExample {
                mode: Mode::Generation,
                index: 0,
            })
            .await;

        let outcome = studio
            .handle(Action::UseTransformationExample {
                source_image: PNG_BYTES.to_vec(),
                temperature: 0.5,
            })
            .await;
        assert_eq!(outcome, Outcome::warning("Pick an example first."));
        assert!(mock.requests().is_empty());
        assert!(mock.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_empty_key_keeps_saved_key() {
        let staging = TempDir::new().unwrap();
        let mock = MockTransport::new();
        mock.push_chunks(vec![image_chunk(b"barn")]);
        let mut studio = signed_in(&mock, &staging).await;

        let outcome = studio.handle(Action::SaveCredential(String::new())).await;
        assert_eq!(outcome, Outcome::error("Please enter an API key.", None));
        assert!(studio.session().is_configured());

        let outcome = studio
            .handle(Action::Generate(GenerationRequest::new("a red barn")))
            .await;
        assert!(matches!(outcome, Outcome::Image(_)));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("transform"), Some(Mode::Transformation));
        assert_eq!(Mode::parse("Image Generation"), Some(Mode::Generation));
        assert_eq!(Mode::parse("video"), None);
        assert_eq!(Mode::Transformation.examples().len(), 5);
    }
}
