use base64::{Engine, engine::general_purpose::STANDARD};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::error;

pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("image file '{}' was not found", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read image file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContent {
    pub mime_type: &'static str,
    pub data: String,
}

impl ImageContent {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EncodeError> {
        Ok(Self {
            mime_type: IMAGE_MIME_TYPE,
            data: encode(path)?,
        })
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

pub fn encode(path: impl AsRef<Path>) -> Result<String, EncodeError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| {
        let err = if err.kind() == ErrorKind::NotFound {
            EncodeError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            EncodeError::Read {
                path: path.to_path_buf(),
                source: err,
            }
        };
        error!(path = %path.display(), error = %err, "image encoding failed");
        err
    })?;

    Ok(STANDARD.encode(bytes))
}
