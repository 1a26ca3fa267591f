use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::path::Path;
use std::pin::Pin;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    config::GeminiConfig,
    error::{Result, StudioError},
    models::{GenerateContentRequest, GenerateContentResponse, UploadResponse, UploadedFile},
};

/// Fragments of one streamed response. Finite and not restartable.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// The two remote capabilities the image client needs.
#[async_trait]
pub trait GeminiTransport: Send + Sync {
    /// Uploads a local file and returns a reference usable as a content part.
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<UploadedFile>;

    async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ChunkStream>;
}

/// `GeminiTransport` over the public REST API.
pub struct HttpTransport {
    client: Client,
    api_key: String,
    base_url: String,
}

impl HttpTransport {
    pub fn new(api_key: impl Into<String>, config: &GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: config.endpoint().to_string(),
        }
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        )
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.base_url)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        log::error!("Gemini returned HTTP {}", status.as_u16());
        log::debug!("Gemini error body: {}", body);
        Err(classify_status(status.as_u16(), &body))
    }
}

#[async_trait]
impl GeminiTransport for HttpTransport {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<UploadedFile> {
        let bytes = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        log::info!("Uploading {} ({} bytes, {})", display_name, bytes.len(), mime_type);

        let start = self
            .client
            .post(self.upload_url())
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "displayName": display_name } }))
            .send()
            .await
            .map_err(|e| StudioError::RemoteCallError(format!("upload start failed: {}", e)))?;
        let start = Self::check(start).await?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                StudioError::RemoteCallError("upload start returned no upload URL".into())
            })?;

        let finished = self
            .client
            .post(&session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StudioError::RemoteCallError(format!("upload failed: {}", e)))?;
        let finished = Self::check(finished).await?;

        let uploaded: UploadResponse = finished.json().await.map_err(|e| {
            StudioError::RemoteCallError(format!("malformed upload response: {}", e))
        })?;
        log::debug!("Uploaded as {} ({})", uploaded.file.name, uploaded.file.uri);
        Ok(uploaded.file)
    }

    async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ChunkStream> {
        log::info!("Invoking streaming model: {}", model);

        let response = self
            .client
            .post(self.stream_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                StudioError::RemoteCallError(format!("request to {} failed: {}", model, e))
            })?;
        let response = Self::check(response).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(32);
        let mut body = response.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            while let Some(next) = body.next().await {
                match next {
                    Ok(bytes) => {
                        for payload in decoder.feed(&bytes) {
                            let chunk = parse_chunk(&payload);
                            let failed = chunk.is_err();
                            if tx.send(chunk).await.is_err() || failed {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(StudioError::RemoteCallError(format!(
                                "stream interrupted: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                }
            }
            if let Some(payload) = decoder.finish() {
                let _ = tx.send(parse_chunk(&payload)).await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Maps a non-2xx answer onto the error taxonomy. A rejected key is an
/// `AuthConfigError`, everything else a `RemoteCallError`.
pub(crate) fn classify_status(status: u16, body: &str) -> StudioError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string());

    let key_rejected = matches!(status, 401 | 403)
        || (status == 400
            && (body.contains("API_KEY_INVALID") || body.contains("API key not valid")));

    if key_rejected {
        StudioError::AuthConfigError(format!(
            "the API key was rejected (HTTP {}): {}",
            status, message
        ))
    } else {
        StudioError::RemoteCallError(format!("Gemini API error {}: {}", status, message))
    }
}

pub(crate) fn parse_chunk(payload: &str) -> Result<GenerateContentResponse> {
    let chunk: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|e| StudioError::RemoteCallError(format!("malformed response chunk: {}", e)))?;
    if let Some(error) = &chunk.error {
        return Err(StudioError::RemoteCallError(match &error.status {
            Some(status) => format!("{} ({})", error.message, status),
            None => error.message.clone(),
        }));
    }
    Ok(chunk)
}

/// Splits a server-sent-event body into `data:` payloads. Lines are only
/// decoded once complete, so multi-byte characters split across network
/// reads survive.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if let Some(data) = line.strip_prefix("data:") {
        let data = data.trim();
        (!data.is_empty()).then(|| data.to_string())
    } else if line.starts_with('{') {
        // some proxies drop the SSE framing and send bare JSON lines
        Some(line.to_string())
    } else {
        None
    }
}
