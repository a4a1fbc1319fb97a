// src/metadata.rs

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything extracted from a single image file.
///
/// `file_metadata` is always populated: a file that cannot be read produces an
/// error instead of a report. The other sections are `None` when their probe
/// failed or was skipped, and `warnings` says why.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageReport {
    pub file_metadata: FileMetadata,
    pub image_metadata: Option<ImageMetadata>,
    pub exif_metadata: Option<ExifMetadata>,
    pub color_metadata: Option<ColorSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ProbeWarning>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileMetadata {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
    /// Hex-encoded SHA-256 of the file contents.
    pub content_hash: String,
    /// Lower-cased, without the leading dot.
    pub extension: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: Option<f64>,
    pub color_mode: String,
    pub format: String,
    pub dpi: Option<Dpi>,
    pub is_animated: bool,
    pub frame_count: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Dpi {
    pub x: f64,
    pub y: f64,
}

impl Dpi {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: round_to(x, 2),
            y: round_to(y, 2),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColorSummary {
    /// Pixels that went into the quantizer after downsampling.
    pub sampled_pixels: u32,
    /// Most frequent first.
    pub colors: Vec<DominantColor>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub hex: String,
    pub pixel_count: u32,
    pub percentage: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ExifMetadata {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub exposure_time: Option<Rational>,
    pub f_number: Option<f64>,
    pub iso: Option<u32>,
    pub gps: Option<GpsCoordinates>,
    pub captured_at: Option<CaptureTime>,
    /// Every tag not folded into the fields above, keyed by tag name.
    pub tags: BTreeMap<String, TagValue>,
}

impl ExifMetadata {
    pub fn is_empty(&self) -> bool {
        self.camera_make.is_none()
            && self.camera_model.is_none()
            && self.exposure_time.is_none()
            && self.f_number.is_none()
            && self.iso.is_none()
            && self.gps.is_none()
            && self.captured_at.is_none()
            && self.tags.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// `DateTimeOriginal` as a structured timestamp, or the raw string when it
/// does not follow `YYYY:MM:DD HH:MM:SS`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum CaptureTime {
    Parsed(NaiveDateTime),
    Raw(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

impl Rational {
    pub fn to_f64(self) -> Option<f64> {
        if self.den == 0 {
            None
        } else {
            Some(self.num as f64 / self.den as f64)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TagValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Rational(Rational),
    Bytes(Vec<u8>),
    Tuple(Vec<TagValue>),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Probe {
    Image,
    Color,
    Exif,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProbeWarning {
    pub probe: Probe,
    pub reason: String,
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
