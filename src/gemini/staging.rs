use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

use crate::error::{Result, StudioError};

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const JPEG_MAGIC: &[u8] = &[0xff, 0xd8, 0xff];

/// Media type of an uploadable image, from its leading bytes. Only PNG and
/// JPEG are accepted.
pub fn sniff_image_type(bytes: &[u8]) -> Result<&'static str> {
    if bytes.is_empty() {
        return Err(StudioError::RequestError("the source image is empty".into()));
    }
    if bytes.starts_with(PNG_MAGIC) {
        Ok("image/png")
    } else if bytes.starts_with(JPEG_MAGIC) {
        Ok("image/jpeg")
    } else {
        Err(StudioError::RequestError(
            "unsupported image format; upload a PNG or JPEG image".into(),
        ))
    }
}

/// Local copy of an upload. The file is deleted when this value is
/// released or dropped, whichever comes first.
pub struct StagedUpload {
    file: NamedTempFile,
    mime_type: &'static str,
}

impl StagedUpload {
    pub fn stage(bytes: &[u8], dir: Option<&Path>) -> Result<Self> {
        let mime_type = sniff_image_type(bytes)?;
        let suffix = if mime_type == "image/png" { ".png" } else { ".jpg" };

        let mut builder = Builder::new();
        builder.prefix("gemini-upload-").suffix(suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        log::debug!("Staged {} bytes at {}", bytes.len(), file.path().display());
        Ok(Self { file, mime_type })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Deletes the staged file. A failed delete is logged and otherwise
    /// ignored so it cannot hide the call's own outcome.
    pub fn release(self) {
        let path: PathBuf = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => log::debug!("Removed staged upload {}", path.display()),
            Err(e) => log::warn!("Could not remove staged upload {}: {}", path.display(), e),
        }
    }
}
