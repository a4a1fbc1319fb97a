//! Independent probes run against a single image file.
//!
//! `file` only needs a path. `image` decodes the file and hands back a
//! [`DecodedImage`] that `color` and `exif` read from.

pub mod color;
mod container;
pub mod exif;
pub mod file;
pub mod image;

pub use self::image::DecodedImage;
