use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::kind::{DocumentClasses, DocumentKind};

/// A document selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub display_name: String,
    pub kind: DocumentKind,
}

/// Collect the documents under `root` that belong to one of `classes`.
///
/// Without `recursive` only the direct children of `root` are considered. Symlinks are not
/// followed. Entries that cannot be read are logged and skipped. The result is sorted by path.
pub fn discover(root: &Path, recursive: bool, classes: DocumentClasses) -> Vec<CandidateFile> {
    if classes.is_empty() {
        return Vec::new();
    }

    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Skipping unreadable entry under {}: {err}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(kind) = classes.classify(entry.path()) else {
            continue;
        };
        files.push(CandidateFile {
            display_name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.into_path(),
            kind,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}
