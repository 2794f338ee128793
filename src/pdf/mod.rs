//! One-shot extraction of the knowledge document used as reply context.

use log::{ info, warn };
use std::fs;
use std::panic;
use std::path::{ Path, PathBuf };
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document not found at '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read document '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to extract text from '{}': {reason}", .path.display())]
    Parse {
        path: PathBuf,
        reason: String,
    },
    #[error("document '{}' contains no extractable text", .0.display())]
    Empty(PathBuf),
}

/// Reads the PDF at `path` and returns the text of all pages, in page order.
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String, DocumentError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(DocumentError::NotFound(path.to_path_buf()));
    }

    info!("Extracting text from {}", path.display());
    let bytes = fs::read(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // pdf-extract panics on some malformed font tables instead of erroring.
    let extracted = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes)).map_err(
        |_| DocumentError::Parse {
            path: path.to_path_buf(),
            reason: "extractor panicked on malformed content".to_string(),
        }
    )?;
    let text = extracted.map_err(|e| DocumentError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let text = normalize(&text);
    if text.is_empty() {
        warn!("{} has no text layer (scanned document?)", path.display());
        return Err(DocumentError::Empty(path.to_path_buf()));
    }

    info!("Loaded {} characters of context from {}", text.chars().count(), path.display());
    Ok(text)
}

/// Trims trailing whitespace per line and collapses runs of blank lines.
fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0;
    for line in raw.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
