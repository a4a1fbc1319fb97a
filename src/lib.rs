//! Descriptive and technical metadata for a single image file.
//!
//! [`extract`] runs four probes and merges them into one [`ImageReport`]:
//!
//! | Probe | Reads |
//! |-------|-------|
//! | file  | size, timestamps, absolute path, extension, SHA-256 of the contents |
//! | image | dimensions, color mode, format, DPI, animation |
//! | color | dominant colors of a downsampled, quantized copy |
//! | exif  | camera, exposure, GPS, capture time and every other EXIF tag |
//!
//! The color and EXIF probes work on the image decoded by the image probe and
//! are skipped when decoding fails. Only an unreadable file is an error.

pub mod config;
pub mod error;
pub mod metadata;
pub mod probes;
pub mod processor;

pub use config::{AppConfig, ColorConfig};
pub use error::ExtractError;
pub use metadata::ImageReport;

use std::path::Path;

/// Extract a report using the default configuration.
pub fn extract(path: impl AsRef<Path>) -> Result<ImageReport, ExtractError> {
    extract_with_config(path, &AppConfig::default())
}

/// Extract a report with caller-supplied settings.
///
/// The configuration is validated first, so out-of-range color settings fail
/// with [`ExtractError::InvalidConfig`] before any probe runs.
pub fn extract_with_config(
    path: impl AsRef<Path>,
    config: &AppConfig,
) -> Result<ImageReport, ExtractError> {
    config.validate()?;
    processor::process_image(config, path.as_ref())
}
