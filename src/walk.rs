//! Directory walker used when archiving a whole tree.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

/// List every regular file under `root`, as paths relative to `root`.
///
/// Entries are sorted by file name so the order is stable within a call.
/// Symbolic links are not followed.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        // WalkDir yields paths prefixed by `root`
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }

    Ok(files)
}

/// Convert a relative filesystem path into a `/`-separated entry name.
pub fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
