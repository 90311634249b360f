use super::PathKind;
use crate::mime::MimeTable;
use crate::opds::{ACQUISITION_TYPE, Link, NAVIGATION_TYPE, Relation};
use std::path::Path;

/// Extensions linked as thumbnails rather than acquisitions.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Derives link relation and media type for catalog paths.
#[derive(Debug, Clone)]
pub struct MetadataMapper {
    mime: MimeTable,
}

impl MetadataMapper {
    /// Create a mapper over a fixed MIME table.
    pub fn new(mime: MimeTable) -> Self {
        Self { mime }
    }

    /// Relation of a link pointing at `path`.
    pub fn relation(&self, path: &Path, kind: PathKind) -> Relation {
        if kind.is_directory() {
            return Relation::Subsection;
        }

        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|image| ext.eq_ignore_ascii_case(image))
            });

        if is_image {
            Relation::Thumbnail
        } else {
            Relation::Acquisition
        }
    }

    /// Media type of a link pointing at `path`; empty when the extension is unknown.
    pub fn media_type(&self, path: &Path, kind: PathKind) -> String {
        match kind {
            PathKind::DirectoryOfFiles => ACQUISITION_TYPE.to_string(),
            PathKind::DirectoryOfDirectories => NAVIGATION_TYPE.to_string(),
            PathKind::File => self.mime.for_path(path).unwrap_or_default().to_string(),
        }
    }

    /// Build the single link of an entry for `path`.
    pub fn link(&self, path: &Path, kind: PathKind, href: String, title: &str) -> Link {
        Link {
            rel: self.relation(path, kind).as_str().to_string(),
            href,
            link_type: self.media_type(path, kind),
            title: Some(title.to_string()),
        }
    }
}
