use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, StudioError};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_PRESERVATION_STRENGTH: u8 = 50;

/// Fixed name offered when a result image is downloaded.
pub const DOWNLOAD_FILE_NAME: &str = "gemini_image.jpg";
pub const DOWNLOAD_MEDIA_TYPE: &str = "image/jpeg";

/// Style presets offered for text-to-image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    Photorealistic,
    DigitalArt,
    OilPainting,
    Watercolor,
    Sketch,
    Cartoon,
    Anime,
    Rendering3d,
    PixelArt,
}

impl ImageStyle {
    pub const ALL: [ImageStyle; 9] = [
        ImageStyle::Photorealistic,
        ImageStyle::DigitalArt,
        ImageStyle::OilPainting,
        ImageStyle::Watercolor,
        ImageStyle::Sketch,
        ImageStyle::Cartoon,
        ImageStyle::Anime,
        ImageStyle::Rendering3d,
        ImageStyle::PixelArt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Photorealistic => "Photorealistic",
            Self::DigitalArt => "Digital Art",
            Self::OilPainting => "Oil Painting",
            Self::Watercolor => "Watercolor",
            Self::Sketch => "Sketch",
            Self::Cartoon => "Cartoon",
            Self::Anime => "Anime",
            Self::Rendering3d => "3D Rendering",
            Self::PixelArt => "Pixel Art",
        }
    }

    /// Parse a display name, ignoring case, spaces, hyphens and underscores
    /// (`"oil painting"`, `"Oil-Painting"` and `"oil_painting"` all match).
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|style| normalize(style.name()) == wanted)
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an uploaded image should be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    #[default]
    StyleTransfer,
    ContentModification,
    BackgroundChange,
}

impl TransformKind {
    pub const ALL: [TransformKind; 3] = [
        TransformKind::StyleTransfer,
        TransformKind::ContentModification,
        TransformKind::BackgroundChange,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::StyleTransfer => "Style Transfer",
            Self::ContentModification => "Content Modification",
            Self::BackgroundChange => "Background Change",
        }
    }

    /// Accepts the full label or its first word (`"style"`, `"content"`, `"background"`).
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = normalize(s);
        Self::ALL.iter().copied().find(|kind| {
            let label = normalize(kind.label());
            label == wanted || (!wanted.is_empty() && label.starts_with(&wanted))
        })
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

pub(crate) fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        DEFAULT_TEMPERATURE
    } else {
        temperature.clamp(0.0, 1.0)
    }
}

/// Text-to-image request, consumed once by the image client.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub style: Option<ImageStyle>,
    pub temperature: f32,
    pub negative_prompt: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: None,
            temperature: DEFAULT_TEMPERATURE,
            negative_prompt: None,
        }
    }

    pub fn with_style(mut self, style: Option<ImageStyle>) -> Self {
        self.style = style;
        self
    }

    /// Clamped into `[0, 1]`.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = clamp_temperature(temperature);
        self
    }

    /// Blank negative prompts are treated as absent.
    pub fn with_negative_prompt(mut self, negative_prompt: Option<String>) -> Self {
        self.negative_prompt = negative_prompt.filter(|n| !n.trim().is_empty());
        self
    }
}

/// Image-to-image request, consumed once by the image client.
#[derive(Clone, PartialEq)]
pub struct TransformationRequest {
    pub source_image: Vec<u8>,
    pub instruction: String,
    pub temperature: f32,
    pub transform_kind: TransformKind,
    pub preservation_strength: u8,
}

impl fmt::Debug for TransformationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationRequest")
            .field("source_image", &format_args!("{} bytes", self.source_image.len()))
            .field("instruction", &self.instruction)
            .field("temperature", &self.temperature)
            .field("transform_kind", &self.transform_kind)
            .field("preservation_strength", &self.preservation_strength)
            .finish()
    }
}

impl TransformationRequest {
    pub fn new(source_image: Vec<u8>, instruction: impl Into<String>) -> Self {
        Self {
            source_image,
            instruction: instruction.into(),
            temperature: DEFAULT_TEMPERATURE,
            transform_kind: TransformKind::default(),
            preservation_strength: DEFAULT_PRESERVATION_STRENGTH,
        }
    }

    /// Clamped into `[0, 1]`.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = clamp_temperature(temperature);
        self
    }

    pub fn with_kind(mut self, kind: TransformKind) -> Self {
        self.transform_kind = kind;
        self
    }

    /// Clamped to at most 100.
    pub fn with_preservation_strength(mut self, strength: u8) -> Self {
        self.preservation_strength = strength.min(100);
        self
    }
}

/// What one call produced. An absent image is not necessarily an error:
/// the model may have declined and explained why in `commentary`.
#[derive(Clone, Default, PartialEq)]
pub struct GenerationResult {
    pub image_bytes: Option<Vec<u8>>,
    pub commentary: String,
}

impl fmt::Debug for GenerationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationResult")
            .field(
                "image_bytes",
                &self.image_bytes.as_ref().map(|b| format!("{} bytes", b.len())),
            )
            .field("commentary", &self.commentary)
            .finish()
    }
}

impl GenerationResult {
    pub fn from_error(error: &StudioError) -> Self {
        Self {
            image_bytes: None,
            commentary: error.to_string(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_bytes.is_some()
    }

    /// Splits into image and commentary, or `EmptyResultWarning` when the
    /// call produced no image.
    pub fn require_image(self) -> Result<(Vec<u8>, String)> {
        match self.image_bytes {
            Some(bytes) => Ok((bytes, self.commentary)),
            None => Err(StudioError::EmptyResultWarning(if self.commentary.is_empty() {
                "the model returned no image data".to_string()
            } else {
                self.commentary
            })),
        }
    }
}

/// Download offer for a rendered result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDownload {
    pub file_name: &'static str,
    pub media_type: &'static str,
}

impl Default for ImageDownload {
    fn default() -> Self {
        Self {
            file_name: DOWNLOAD_FILE_NAME,
            media_type: DOWNLOAD_MEDIA_TYPE,
        }
    }
}
