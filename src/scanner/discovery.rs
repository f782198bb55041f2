use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::RetrievalError;

/// Listing of a folder's direct entries, split into image candidates and
/// the total entry count.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub entries: usize,
    pub candidates: Vec<PathBuf>,
}

/// List entries directly inside `directory` and keep those whose file name
/// ends with one of `extensions` (compared case-insensitively, without the
/// leading dot).
///
/// Order follows the directory listing. Entries are not filtered by type.
pub fn discover_candidates(
    directory: &Path,
    extensions: &[String],
) -> Result<Discovery, RetrievalError> {
    let suffixes: Vec<String> = extensions
        .iter()
        .map(|e| format!(".{}", e.trim_start_matches('.').to_lowercase()))
        .collect();

    let mut discovery = Discovery::default();

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(RetrievalError::ListFolder {
                    path: directory.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        discovery.entries += 1;

        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())) {
            continue;
        }

        // The result goes out as one line of text, so the path must survive that
        match entry.path().to_str() {
            Some(path) if !path.contains(['\n', '\r']) => {
                discovery.candidates.push(entry.into_path());
            }
            Some(_) => {
                tracing::warn!(path = ?entry.path(), "Skipping image with a line break in its path");
            }
            None => {
                tracing::warn!(path = ?entry.path(), "Skipping image with a non UTF-8 path");
            }
        }
    }

    Ok(discovery)
}
