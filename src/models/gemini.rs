//! Wire types for the Gemini `streamGenerateContent` and Files endpoints.

use serde::{Deserialize, Serialize};

use super::image::clamp_temperature;
use crate::config::GenerationSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn file(file: &UploadedFile) -> Self {
        Self {
            file_data: Some(FileData {
                mime_type: file.mime_type.clone(),
                file_uri: file.uri.clone(),
            }),
            ..Default::default()
        }
    }
}

/// Base64 payload carried directly inside a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_modalities: Vec<String>,
    pub response_mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    /// One user message with the fixed settings and the given temperature,
    /// clamped into `[0, 1]`.
    pub fn new(parts: Vec<Part>, settings: &GenerationSettings, temperature: f32) -> Self {
        Self {
            contents: vec![Content::user(parts)],
            generation_config: GenerationConfig {
                temperature: clamp_temperature(temperature),
                top_p: settings.top_p,
                top_k: settings.top_k,
                max_output_tokens: settings.max_output_tokens,
                response_modalities: settings.response_modalities.clone(),
                response_mime_type: settings.response_mime_type.clone(),
            },
            safety_settings: vec![SafetySetting {
                category: settings.disabled_safety_category.clone(),
                threshold: "OFF".to_string(),
            }],
        }
    }

    /// All text parts of the request, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// One fragment of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl GenerateContentResponse {
    pub fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Inline payload of the first part, if it has a non-empty one.
    pub fn leading_inline_data(&self) -> Option<&InlineData> {
        self.parts()
            .first()
            .and_then(|p| p.inline_data.as_ref())
            .filter(|d| !d.data.is_empty())
    }

    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> String {
        self.parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    pub fn text_chunk(text: impl Into<String>) -> Self {
        Self::with_parts(vec![Part::text(text)])
    }

    pub fn image_chunk(mime_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        Self::with_parts(vec![Part {
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: base64_data.into(),
            }),
            ..Default::default()
        }])
    }

    pub fn with_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts,
                }),
                finish_reason: None,
            }],
            error: None,
        }
    }
}

/// A staged file the service can reference from a later call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    #[serde(default)]
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub file: UploadedFile,
}
