//! Default bibliography style and database discovery.
//!
//! When no style or database is given, the project directory decides:
//! the single `.bst` file is the style, and every `.bib` file is a database.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when looking for default resources.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Failed to read directory: {0}")]
    IoError(#[from] std::io::Error),

    #[error(
        "Found {} .{} files in {}, expected exactly one: {}",
        .found.len(),
        .extension,
        .dir.display(),
        .found.join(", ")
    )]
    AmbiguousStyleOrData {
        extension: &'static str,
        dir: PathBuf,
        found: Vec<String>,
    },

    #[error("No .{} file found in {}", .extension, .dir.display())]
    Missing { extension: &'static str, dir: PathBuf },
}

/// File stems with the given extension in `dir`, sorted.
fn stems_with_extension(dir: &Path, extension: &str) -> Result<Vec<String>, ResourceError> {
    let mut stems = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().map_or(true, |e| e != extension) {
            continue;
        }
        if let Some(stem) = path.file_stem() {
            stems.push(stem.to_string_lossy().to_string());
        }
    }

    stems.sort();
    Ok(stems)
}

/// Returns the stem of the only `.bst` file in `dir`, as `\bibliographystyle` expects it.
///
/// # Errors
///
/// `AmbiguousStyleOrData` if there are several, `Missing` if there is none.
pub fn discover_style(dir: &Path) -> Result<String, ResourceError> {
    let mut found = stems_with_extension(dir, "bst")?;
    debug!(?found, "bibliography styles");

    match found.len() {
        0 => Err(ResourceError::Missing {
            extension: "bst",
            dir: dir.to_path_buf(),
        }),
        1 => Ok(found.remove(0)),
        _ => Err(ResourceError::AmbiguousStyleOrData {
            extension: "bst",
            dir: dir.to_path_buf(),
            found,
        }),
    }
}

/// Returns every `.bib` stem in `dir`, comma-joined as `\bibliography` expects them.
pub fn discover_data(dir: &Path) -> Result<String, ResourceError> {
    let found = stems_with_extension(dir, "bib")?;
    debug!(?found, "bibliography databases");

    if found.is_empty() {
        return Err(ResourceError::Missing {
            extension: "bib",
            dir: dir.to_path_buf(),
        });
    }
    Ok(found.join(","))
}
