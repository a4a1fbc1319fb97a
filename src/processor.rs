use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::metadata::{ImageReport, Probe, ProbeWarning};
use crate::probes;
use std::path::Path;

/// Run every probe against `path` and merge the results.
///
/// Only a failing file probe aborts: without a readable file there is
/// nothing to report. Any other failure leaves its section empty and is
/// recorded in `warnings`.
pub fn process_image(config: &AppConfig, path: &Path) -> Result<ImageReport, ExtractError> {
    log::info!("Processing image started for: {:?}", path);

    let file_metadata = probes::file::probe(path, config.hash_block_size)?;

    let mut warnings = Vec::new();
    let mut image_metadata = None;
    let mut exif_metadata = None;
    let mut color_metadata = None;

    match probes::image::probe(path) {
        Ok((metadata, decoded)) => {
            image_metadata = Some(metadata);

            exif_metadata = settle(&mut warnings, Probe::Exif, probes::exif::probe(&decoded));

            if config.analyze_colors {
                color_metadata = settle(
                    &mut warnings,
                    Probe::Color,
                    probes::color::probe(&decoded, &config.color),
                );
            } else {
                log::debug!("Color analysis disabled, skipping");
            }
        }
        Err(e) => {
            let reason = e.to_string();
            warn(&mut warnings, Probe::Image, reason.clone());
            let skipped = format!("skipped, image could not be decoded: {}", reason);
            warn(&mut warnings, Probe::Exif, skipped.clone());
            if config.analyze_colors {
                warn(&mut warnings, Probe::Color, skipped);
            }
        }
    }

    log::info!(
        "Processing image finished for: {:?} ({} warnings)",
        path,
        warnings.len()
    );

    Ok(ImageReport {
        file_metadata,
        image_metadata,
        exif_metadata,
        color_metadata,
        warnings,
    })
}

fn settle<T>(
    warnings: &mut Vec<ProbeWarning>,
    probe: Probe,
    result: Result<T, ExtractError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn(warnings, probe, e.to_string());
            None
        }
    }
}

fn warn(warnings: &mut Vec<ProbeWarning>, probe: Probe, reason: String) {
    log::warn!("{:?} probe failed: {}", probe, reason);
    warnings.push(ProbeWarning { probe, reason });
}
