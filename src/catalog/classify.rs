use crate::error::{AppError, Result};
use crate::opds::FeedKind;
use std::fs;
use std::path::Path;

/// What a filesystem path looks like to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Anything that is not a directory.
    File,
    /// A directory with at least one non-directory child.
    DirectoryOfFiles,
    /// A directory whose children are all directories, or that is empty.
    DirectoryOfDirectories,
}

impl PathKind {
    /// Whether this is one of the directory kinds.
    pub fn is_directory(&self) -> bool {
        !matches!(self, PathKind::File)
    }

    /// Kind of feed a directory of this kind is served as.
    pub fn feed_kind(&self) -> FeedKind {
        match self {
            PathKind::DirectoryOfFiles => FeedKind::Acquisition,
            _ => FeedKind::Navigation,
        }
    }
}

/// Classify `path` by looking at it and, for directories, its immediate children.
///
/// Grandchildren are never inspected: a directory holding only
/// sub-directories is `DirectoryOfDirectories` even when those contain files.
pub fn classify(path: &Path) -> Result<PathKind> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        // Dangling link: the link itself is still an entry.
        Err(e) if fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) => {
            tracing::debug!(path = %path.display(), error = %e, "Dangling symlink");
            return Ok(PathKind::File);
        }
        Err(e) => return Err(AppError::from_fs(path, e)),
    };
    if !metadata.is_dir() {
        return Ok(PathKind::File);
    }

    for child in fs::read_dir(path).map_err(|e| AppError::from_fs(path, e))? {
        let child = child.map_err(|e| AppError::from_fs(path, e))?;
        let file_type = child
            .file_type()
            .map_err(|e| AppError::from_fs(&child.path(), e))?;

        let is_dir = if file_type.is_symlink() {
            fs::metadata(child.path()).is_ok_and(|m| m.is_dir())
        } else {
            file_type.is_dir()
        };

        if !is_dir {
            return Ok(PathKind::DirectoryOfFiles);
        }
    }

    Ok(PathKind::DirectoryOfDirectories)
}
