use crate::error::ExtractError;
use crate::metadata::{round_to, FileMetadata};
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn probe(path: &Path, block_size: usize) -> Result<FileMetadata, ExtractError> {
    log::trace!("Reading file attributes for: {:?}", path);
    let stat = std::fs::metadata(path).map_err(|e| ExtractError::from_io(path, e))?;
    let absolute = std::path::absolute(path).map_err(|e| ExtractError::from_io(path, e))?;

    log::trace!("Calculating hash for image: {:?}", path);
    let content_hash = hash_file(path, block_size)?;
    log::debug!("Calculated hash for {:?}: {}", path, content_hash);

    Ok(FileMetadata {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: absolute,
        size_bytes: stat.len(),
        size_mb: round_to(stat.len() as f64 / BYTES_PER_MB, 2),
        created: stat.created().ok().map(DateTime::<Local>::from),
        modified: stat.modified().ok().map(DateTime::<Local>::from),
        content_hash,
        extension: extension(path),
    })
}

/// SHA-256 over the file, read `block_size` bytes at a time.
pub fn hash_file(path: &Path, block_size: usize) -> Result<String, ExtractError> {
    let mut file = File::open(path).map_err(|e| ExtractError::from_io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; block_size.max(1)];
    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| ExtractError::from_io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}
