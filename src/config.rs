use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TRANSFORMATION_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

/// Sampling and safety parameters sent with every call. Only the
/// temperature changes between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_modalities: Vec<String>,
    pub disabled_safety_category: String,
    pub response_mime_type: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_modalities: vec!["image".to_string(), "text".to_string()],
            disabled_safety_category: "HARM_CATEGORY_CIVIC_INTEGRITY".to_string(),
            response_mime_type: "text/plain".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub generation_model: String,
    pub transformation_model: String,
    pub staging_dir: Option<PathBuf>,
    pub settings: GenerationSettings,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            transformation_model: DEFAULT_TRANSFORMATION_MODEL.to_string(),
            staging_dir: None,
            settings: GenerationSettings::default(),
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("generation_model", &self.generation_model)
            .field("transformation_model", &self.transformation_model)
            .field("staging_dir", &self.staging_dir)
            .field("settings", &self.settings)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = api_key_from(|name| env::var(name).ok());
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let generation_model = env::var("GEMINI_GENERATION_MODEL")
            .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string());
        let transformation_model = env::var("GEMINI_TRANSFORMATION_MODEL")
            .unwrap_or_else(|_| DEFAULT_TRANSFORMATION_MODEL.to_string());
        let staging_dir = env::var("GEMINI_STAGING_DIR").ok().map(PathBuf::from);

        GeminiConfig {
            api_key,
            base_url,
            generation_model,
            transformation_model,
            staging_dir,
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_models(
        mut self,
        generation_model: impl Into<String>,
        transformation_model: impl Into<String>,
    ) -> Self {
        self.generation_model = generation_model.into();
        self.transformation_model = transformation_model.into();
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Base URL without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`. Blank values count as unset.
fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
        .into_iter()
        .filter_map(|name| lookup(name))
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}
