use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use std::sync::Arc;

use crate::{
    config::GeminiConfig,
    error::{Result, StudioError},
    gemini::{
        staging::StagedUpload,
        transport::{ChunkStream, GeminiTransport},
    },
    logger,
    models::{
        GenerateContentRequest, GenerateContentResponse, GenerationRequest, GenerationResult,
        Part, TransformationRequest,
    },
    prompt,
};

#[derive(Clone)]
pub struct ImageClient {
    transport: Arc<dyn GeminiTransport>,
    config: GeminiConfig,
}

impl ImageClient {
    pub fn new(transport: Arc<dyn GeminiTransport>, config: GeminiConfig) -> Self {
        Self { transport, config }
    }

    /// Text-to-image. Failures come back as an empty result whose
    /// commentary is the error description.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        self.try_generate(request).await.unwrap_or_else(|e| {
            log::error!("Error generating image: {}", e);
            GenerationResult::from_error(&e)
        })
    }

    pub async fn try_generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        if request.prompt.is_empty() {
            return Err(StudioError::RequestError("the prompt is empty".into()));
        }
        let full_prompt = prompt::generation_prompt(request);

        let _timer = logger::timer("image generation");
        log::debug!("Generation prompt: {}", full_prompt);

        let body = GenerateContentRequest::new(
            vec![Part::text(full_prompt)],
            &self.config.settings,
            request.temperature,
        );
        let stream = self
            .transport
            .stream_generate(&self.config.generation_model, &body)
            .await?;
        collect_chunks(stream).await
    }

    /// Image-to-image. Same error conversion as [`ImageClient::generate`].
    pub async fn transform(&self, request: &TransformationRequest) -> GenerationResult {
        self.try_transform(request).await.unwrap_or_else(|e| {
            log::error!("Error transforming image: {}", e);
            GenerationResult::from_error(&e)
        })
    }

    pub async fn try_transform(&self, request: &TransformationRequest) -> Result<GenerationResult> {
        let instruction = prompt::transformation_instruction(request);
        self.try_transform_image(&request.source_image, &instruction, request.temperature)
            .await
    }

    /// Sends `instruction` as-is, without a transformation template.
    pub async fn transform_image(
        &self,
        source_image: &[u8],
        instruction: &str,
        temperature: f32,
    ) -> GenerationResult {
        self.try_transform_image(source_image, instruction, temperature)
            .await
            .unwrap_or_else(|e| {
                log::error!("Error transforming image: {}", e);
                GenerationResult::from_error(&e)
            })
    }

    /// The source image is staged to a temporary file for the upload; the
    /// file is removed before this returns, whatever the outcome.
    pub async fn try_transform_image(
        &self,
        source_image: &[u8],
        instruction: &str,
        temperature: f32,
    ) -> Result<GenerationResult> {
        if instruction.is_empty() {
            return Err(StudioError::RequestError(
                "the transformation instruction is empty".into(),
            ));
        }

        let staged = StagedUpload::stage(source_image, self.config.staging_dir.as_deref())?;
        let outcome = self.transform_staged(&staged, instruction, temperature).await;
        staged.release();
        outcome
    }

    async fn transform_staged(
        &self,
        staged: &StagedUpload,
        instruction: &str,
        temperature: f32,
    ) -> Result<GenerationResult> {
        let _timer = logger::timer("image transformation");

        let file = self
            .transport
            .upload(staged.path(), staged.mime_type())
            .await?;
        log::debug!("Transformation instruction: {}", instruction);

        let body = GenerateContentRequest::new(
            vec![
                Part::file(&file),
                Part::text(format!("Transform this image: {}", instruction)),
            ],
            &self.config.settings,
            temperature,
        );
        let stream = self
            .transport
            .stream_generate(&self.config.transformation_model, &body)
            .await?;
        collect_chunks(stream).await
    }
}

/// Drains a response stream. The first non-empty inline payload becomes the
/// image; later payloads are dropped. Text from chunks that do not lead
/// with a payload is appended to the commentary.
pub(crate) async fn collect_chunks(mut stream: ChunkStream) -> Result<GenerationResult> {
    let mut collector = ChunkCollector::default();
    while let Some(chunk) = stream.next().await {
        collector.absorb(&chunk?)?;
    }
    Ok(collector.finish())
}

#[derive(Default)]
struct ChunkCollector {
    image: Option<Vec<u8>>,
    commentary: String,
    seen: usize,
}

impl ChunkCollector {
    fn absorb(&mut self, chunk: &GenerateContentResponse) -> Result<()> {
        self.seen += 1;
        if chunk.parts().is_empty() {
            return Ok(());
        }

        match chunk.leading_inline_data() {
            Some(_) if self.image.is_some() => {
                log::debug!("Ignoring extra image payload in chunk {}", self.seen);
            }
            Some(inline) => {
                let bytes = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
                    StudioError::RemoteCallError(format!("malformed image payload: {}", e))
                })?;
                log::info!(
                    "Received {} image ({} bytes) in chunk {}",
                    inline.mime_type,
                    bytes.len(),
                    self.seen
                );
                self.image = Some(bytes);
            }
            None => self.commentary.push_str(&chunk.text()),
        }
        Ok(())
    }

    fn finish(self) -> GenerationResult {
        if self.image.is_none() {
            log::warn!("Stream of {} chunks carried no image", self.seen);
        }
        GenerationResult {
            image_bytes: self.image,
            commentary: self.commentary,
        }
    }
}
