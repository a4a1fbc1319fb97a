use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use exif::Error as ExifError;
use image::ImageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt image: {0}")]
    CorruptImage(String),

    #[error("Color analysis unavailable: {0}")]
    ColorAnalysisUnavailable(String),

    #[error("EXIF error: {0}")]
    Exif(#[from] ExifError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ExtractError {
    /// Classify a filesystem error raised while touching `path`.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ExtractError::FileNotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => ExtractError::PermissionDenied(path.to_path_buf()),
            _ => ExtractError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

impl From<ImageError> for ExtractError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Unsupported(e) => ExtractError::UnsupportedFormat(e.to_string()),
            other => ExtractError::CorruptImage(other.to_string()),
        }
    }
}
