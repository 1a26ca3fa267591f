//! In-memory transport for tests: scripted streams, recorded calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{
    error::{Result, StudioError},
    gemini::transport::{ChunkStream, GeminiTransport},
    models::{GenerateContentRequest, GenerateContentResponse, UploadedFile},
};

enum Script {
    Stream(Vec<Result<GenerateContentResponse>>),
    Fail(StudioError),
}

#[derive(Debug, Clone)]
pub(crate) struct UploadRecord {
    pub path: PathBuf,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    scripts: Mutex<VecDeque<Script>>,
    upload_error: Mutex<Option<StudioError>>,
    requests: Mutex<Vec<(String, GenerateContentRequest)>>,
    uploads: Mutex<Vec<UploadRecord>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_chunks(&self, chunks: Vec<GenerateContentResponse>) {
        self.push_stream(chunks.into_iter().map(Ok).collect());
    }

    pub fn push_stream(&self, items: Vec<Result<GenerateContentResponse>>) {
        self.scripts.lock().unwrap().push_back(Script::Stream(items));
    }

    pub fn push_failure(&self, error: StudioError) {
        self.scripts.lock().unwrap().push_back(Script::Fail(error));
    }

    pub fn fail_uploads(&self, error: StudioError) {
        *self.upload_error.lock().unwrap() = Some(error);
    }

    pub fn requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeminiTransport for MockTransport {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<UploadedFile> {
        // reading proves the staged file exists while the call is in flight
        let bytes = std::fs::read(path)?;
        let count = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(UploadRecord {
                path: path.to_path_buf(),
                mime_type: mime_type.to_string(),
                bytes,
            });
            uploads.len()
        };

        if let Some(error) = self.upload_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(UploadedFile {
            name: format!("files/upload-{}", count),
            uri: format!("https://mock.test/files/upload-{}", count),
            mime_type: mime_type.to_string(),
        })
    }

    async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ChunkStream> {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));

        let next = self.scripts.lock().unwrap().pop_front();
        match next {
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Stream(items)) => Ok(Box::pin(futures::stream::iter(items))),
            None => Ok(Box::pin(futures::stream::empty())),
        }
    }
}
