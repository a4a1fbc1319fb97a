//! Dominant colors via a NeuQuant palette over a downsampled copy.

use super::DecodedImage;
use crate::config::ColorConfig;
use crate::error::ExtractError;
use crate::metadata::{round_to, ColorSummary, DominantColor};
use color_quant::NeuQuant;
use image::DynamicImage;

pub fn probe(decoded: &DecodedImage, config: &ColorConfig) -> Result<ColorSummary, ExtractError> {
    summarize(&decoded.image, config)
}

pub fn summarize(image: &DynamicImage, config: &ColorConfig) -> Result<ColorSummary, ExtractError> {
    let color = image.color();
    if !color.has_color() {
        return Err(ExtractError::ColorAnalysisUnavailable(format!(
            "{:?} has no color channels",
            color
        )));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(ExtractError::ColorAnalysisUnavailable("image has no pixels".into()));
    }

    let sample = downsample(image, config.max_dimension);
    let rgba = sample.to_rgba8();
    let total = rgba.width() * rgba.height();
    log::trace!(
        "Quantizing {}x{} sample into {} colors",
        rgba.width(),
        rgba.height(),
        config.palette_size
    );

    let quantizer = NeuQuant::new(config.sample_factor, config.palette_size, rgba.as_raw());
    let palette = quantizer.color_map_rgb();

    // Palette entries can collapse onto the same RGB value, so counts are
    // merged by color. Entries keep the lowest palette index that produced
    // them, which is what ties are ordered by.
    let mut counts: Vec<(usize, [u8; 3], u32)> = Vec::new();
    for pixel in rgba.pixels() {
        let index = quantizer.index_of(&pixel.0);
        let rgb = palette_entry(&palette, index);
        match counts.iter_mut().find(|(_, c, _)| *c == rgb) {
            Some((first_index, _, count)) => {
                *first_index = (*first_index).min(index);
                *count += 1;
            }
            None => counts.push((index, rgb, 1)),
        }
    }

    let colors = rank(counts, config.top_n, total);
    log::debug!("Dominant colors: {:?}", colors.iter().map(|c| &c.hex).collect::<Vec<_>>());
    Ok(ColorSummary {
        sampled_pixels: total,
        colors,
    })
}

fn downsample(image: &DynamicImage, max_dimension: u32) -> DynamicImage {
    if image.width().max(image.height()) <= max_dimension {
        return image.clone();
    }
    image.thumbnail(max_dimension, max_dimension)
}

fn palette_entry(palette: &[u8], index: usize) -> [u8; 3] {
    let start = index * 3;
    match palette.get(start..start + 3) {
        Some(&[r, g, b]) => [r, g, b],
        _ => [0, 0, 0],
    }
}

/// Most frequent first, ties in palette order, truncated to `top_n`.
fn rank(mut counts: Vec<(usize, [u8; 3], u32)>, top_n: usize, total: u32) -> Vec<DominantColor> {
    counts.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
    counts
        .into_iter()
        .take(top_n)
        .map(|(_, rgb, pixel_count)| DominantColor {
            rgb,
            hex: format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]),
            pixel_count,
            percentage: round_to(pixel_count as f64 / total.max(1) as f64 * 100.0, 2),
        })
        .collect()
}
