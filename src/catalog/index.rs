//! Whole-tree snapshot backing the `/latest` and `/titles` collections.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// A content file found under the catalog root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Base file name.
    pub name: String,
    /// Absolute path, unique within a snapshot.
    pub path: PathBuf,
    /// Last modified time.
    pub modified: DateTime<Utc>,
    /// File size in bytes.
    pub size: u64,
}

/// Every content file under the root, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<ContentEntry>,
}

impl Snapshot {
    /// Wrap entries already in discovery order.
    pub fn from_entries(entries: Vec<ContentEntry>) -> Self {
        Self { entries }
    }

    /// Walk the whole tree under `root` and collect every non-directory.
    ///
    /// Entries that cannot be read are logged and skipped; the walk always
    /// runs to completion.
    pub fn scan(root: &Path) -> Self {
        let mut entries = Vec::new();

        for item in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(
                        path = ?e.path(),
                        error = %e,
                        "Skipping unreadable catalog entry"
                    );
                    continue;
                }
            };

            if item.file_type().is_dir() {
                continue;
            }

            let metadata = match item.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(path = %item.path().display(), error = %e, "Skipping entry without metadata");
                    continue;
                }
            };

            let modified = match metadata.modified() {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(e) => {
                    tracing::warn!(path = %item.path().display(), error = %e, "Skipping entry without mtime");
                    continue;
                }
            };

            entries.push(ContentEntry {
                name: super::display_name(item.file_name()),
                path: item.into_path(),
                modified,
                size: metadata.len(),
            });
        }

        Self { entries }
    }

    /// Entries in discovery order.
    pub fn entries(&self) -> &[ContentEntry] {
        &self.entries
    }

    /// Most recently modified first; ties keep discovery order.
    pub fn latest(&self) -> Vec<&ContentEntry> {
        let mut sorted: Vec<&ContentEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.modified.cmp(&a.modified));
        sorted
    }

    /// Ascending by name in codepoint order; ties keep discovery order.
    pub fn by_title(&self) -> Vec<&ContentEntry> {
        let mut sorted: Vec<&ContentEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Holder of the current snapshot.
///
/// Publication swaps the whole `Arc` under a write lock, so readers see
/// either the previous snapshot or the new one in full.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    current: RwLock<Arc<Snapshot>>,
}

impl CatalogIndex {
    /// Create an index holding an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-walk `root` and publish the result.
    pub fn rebuild(&self, root: &Path) -> Arc<Snapshot> {
        let start = std::time::Instant::now();
        let snapshot = Snapshot::scan(root);

        tracing::info!(
            root = %root.display(),
            entries = snapshot.len(),
            elapsed = ?start.elapsed(),
            "Catalog index rebuilt"
        );

        self.publish(snapshot)
    }

    /// Replace the current snapshot.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Arc::clone(&snapshot);
        snapshot
    }

    /// The most recently published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }
}
