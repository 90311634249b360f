//! Extension to MIME type associations.
//!
//! The table is assembled once at startup and never mutated afterwards:
//! common web types first, then whatever the host's `mime.types` files
//! declare, then the e-book formats the catalog must always recognise,
//! and finally any overrides from the configuration file.

use crate::config::MimeConfig;
use std::collections::HashMap;
use std::path::Path;

/// Locations of system MIME databases, read in order.
const SYSTEM_FILES: &[&str] = &[
    "/etc/mime.types",
    "/etc/apache2/mime.types",
    "/etc/apache/mime.types",
    "/etc/httpd/conf/mime.types",
];

/// Types every host knows about, even without a system database.
const COMMON_TYPES: &[(&str, &str)] = &[
    ("avif", "image/avif"),
    ("css", "text/css; charset=utf-8"),
    ("gif", "image/gif"),
    ("htm", "text/html; charset=utf-8"),
    ("html", "text/html; charset=utf-8"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain; charset=utf-8"),
    ("webp", "image/webp"),
    ("xml", "text/xml; charset=utf-8"),
];

/// E-book and comic formats, applied over the system database.
const EBOOK_TYPES: &[(&str, &str)] = &[
    ("mobi", "application/x-mobipocket-ebook"),
    ("epub", "application/epub+zip"),
    ("cbz", "application/x-cbz"),
    ("cbr", "application/x-cbr"),
    ("fb2", "text/fb2+xml"),
    ("pdf", "application/pdf"),
];

/// Immutable extension lookup table.
#[derive(Debug, Clone, Default)]
pub struct MimeTable {
    types: HashMap<String, String>,
}

impl MimeTable {
    /// Common types plus e-book formats, without consulting the host.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        table.extend(COMMON_TYPES);
        table.extend(EBOOK_TYPES);
        table
    }

    /// Build the table described by the `[mime]` configuration section.
    pub fn from_config(config: &MimeConfig) -> Self {
        let mut table = Self::default();
        table.extend(COMMON_TYPES);

        if config.system {
            for file in SYSTEM_FILES {
                match std::fs::read_to_string(file) {
                    Ok(content) => {
                        let before = table.types.len();
                        table.merge_mime_types(&content);
                        tracing::debug!(
                            file,
                            added = table.types.len().saturating_sub(before),
                            "Loaded system MIME types"
                        );
                    }
                    Err(e) => tracing::trace!(file, error = %e, "No system MIME file"),
                }
            }
        }

        table.extend(EBOOK_TYPES);

        for (ext, mime_type) in &config.types {
            table.insert(ext, mime_type);
        }

        table
    }

    /// Parse the `type ext ext ...` format used by `/etc/mime.types`.
    pub(crate) fn merge_mime_types(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let Some(mime_type) = fields.next() else {
                continue;
            };
            for ext in fields {
                self.insert(ext, mime_type);
            }
        }
    }

    fn extend(&mut self, pairs: &[(&str, &str)]) {
        for (ext, mime_type) in pairs {
            self.insert(ext, mime_type);
        }
    }

    fn insert(&mut self, ext: &str, mime_type: &str) {
        let ext = normalize_extension(ext);
        if !ext.is_empty() {
            self.types.insert(ext, mime_type.to_string());
        }
    }

    /// Look up an extension, with or without the leading dot.
    pub fn lookup(&self, ext: &str) -> Option<&str> {
        self.types
            .get(&normalize_extension(ext))
            .map(String::as_str)
    }

    /// Look up the type for a path's extension.
    pub fn for_path(&self, path: &Path) -> Option<&str> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.lookup(e))
    }

    /// Number of known extensions.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table has no associations.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
