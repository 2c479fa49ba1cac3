use std::io;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest attachment accepted, in bytes (5 MiB). The bound is inclusive.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("image is {size} bytes, over the 5 MiB limit")]
    TooLarge { size: u64 },
    #[error("{content_type} is not an image type")]
    NotAnImage { content_type: String },
    #[error("could not read attachment: {0}")]
    ReadFailure(#[from] io::Error),
}

/// A file the user picked, before validation. The content type is declared
/// from the file extension, not sniffed from the bytes.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub size: u64,
    pub content_type: String,
}

impl SelectedFile {
    pub async fn from_path(path: impl Into<PathBuf>) -> Result<Self, AttachmentError> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            size: metadata.len(),
            content_type,
            path,
        })
    }
}

/// A validated image, self-contained and ready to embed in a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    content_type: String,
    base64: String,
}

impl ImagePayload {
    pub fn new(content_type: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            base64: base64.into(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Raw base64 contents, the form the model endpoint wants.
    pub fn base64_data(&self) -> &str {
        &self.base64
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.base64)
    }
}

/// Size and type preconditions, checked before any bytes are read.
pub fn check(file: &SelectedFile) -> Result<(), AttachmentError> {
    if file.size > MAX_IMAGE_BYTES {
        return Err(AttachmentError::TooLarge { size: file.size });
    }
    if !file.content_type.starts_with("image/") {
        return Err(AttachmentError::NotAnImage {
            content_type: file.content_type.clone(),
        });
    }
    Ok(())
}

/// Validates the file and reads its full contents into an embeddable payload.
/// Does not touch the draft; staging the result is the caller's job.
pub async fn load(file: &SelectedFile) -> Result<ImagePayload, AttachmentError> {
    check(file)?;
    let bytes = tokio::fs::read(&file.path).await?;
    Ok(ImagePayload {
        content_type: file.content_type.clone(),
        base64: STANDARD.encode(&bytes),
    })
}
