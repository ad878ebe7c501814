//! Filesystem traversal for the scan root

use crate::{IndexError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A regular file found under the scan root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path, used for probing
    pub path: PathBuf,

    /// Directory containing the file, relative to the scan root
    pub relative_dir: PathBuf,

    /// Bare file name
    pub filename: String,
}

/// Enumerate every regular file under `root`, recursively.
///
/// Entries are visited in file-name order within each directory so repeated
/// runs see files in the same sequence. Unreadable entries and non-UTF-8
/// names are logged and skipped.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    if !root.is_dir() {
        return Err(IndexError::InvalidDirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                warn!("Skipping file with non-UTF-8 name: {}", path.display());
                continue;
            }
        };

        let relative_dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        files.push(DiscoveredFile {
            path: path.to_path_buf(),
            relative_dir,
            filename,
        });
    }

    debug!("Discovered {} files under {}", files.len(), root.display());
    Ok(files)
}
