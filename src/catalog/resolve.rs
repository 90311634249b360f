use super::{CatalogIndex, FeedAssembler, PathKind, classify};
use crate::error::{AppError, Result};
use crate::opds::{Feed, FeedKind};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;

/// What the transport should send back for a request.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A catalog document.
    Feed {
        /// Navigation or acquisition.
        kind: FeedKind,
        /// The document itself.
        feed: Feed,
    },
    /// Raw bytes of a content file.
    File {
        /// Absolute path of the file.
        path: PathBuf,
        /// Type from the extension table; empty when unknown.
        media_type: String,
    },
}

/// Maps request paths to feeds or files.
#[derive(Clone)]
pub struct FeedResolver {
    root: PathBuf,
    index: Arc<CatalogIndex>,
    assembler: FeedAssembler,
}

impl FeedResolver {
    /// Create a resolver for `root`, publishing snapshots into `index`.
    pub fn new(root: PathBuf, index: Arc<CatalogIndex>, assembler: FeedAssembler) -> Self {
        Self {
            root,
            index,
            assembler,
        }
    }

    /// The snapshot container shared with this resolver.
    pub fn index(&self) -> &Arc<CatalogIndex> {
        &self.index
    }

    /// Resolve a raw (still percent-encoded) request path.
    pub fn resolve(&self, raw_path: &str) -> Result<Resolution> {
        let url_path = match String::from_utf8(decode_request_bytes(raw_path)?) {
            Ok(url_path) => url_path,
            Err(e) => return self.resolve_raw(raw_path, e.into_bytes()),
        };
        tracing::debug!(url_path = %url_path, "Resolving request");

        match url_path.as_str() {
            "/" => {
                self.index.rebuild(&self.root);
                Ok(Resolution::Feed {
                    kind: FeedKind::Navigation,
                    feed: self.assembler.build_root_feed(),
                })
            }
            "/latest" => {
                let snapshot = self.index.current();
                let feed = self
                    .assembler
                    .build_virtual_feed(&snapshot.latest(), &url_path)?;
                Ok(Resolution::Feed {
                    kind: FeedKind::Acquisition,
                    feed,
                })
            }
            "/titles" => {
                let snapshot = self.index.current();
                let feed = self
                    .assembler
                    .build_virtual_feed(&snapshot.by_title(), &url_path)?;
                Ok(Resolution::Feed {
                    kind: FeedKind::Acquisition,
                    feed,
                })
            }
            _ => self.resolve_filesystem(self.filesystem_path(&url_path), &url_path),
        }
    }

    /// Paths that only exist as raw bytes can still name files and
    /// directories under the root, but never the virtual collections.
    #[cfg(unix)]
    fn resolve_raw(&self, raw_path: &str, bytes: Vec<u8>) -> Result<Resolution> {
        use std::os::unix::ffi::OsStrExt;

        let url_path = String::from_utf8_lossy(&bytes).into_owned();
        tracing::debug!(url_path = %url_path, "Resolving non-UTF-8 request");

        let segments = bytes.split(|b| *b == b'/').map(OsStr::from_bytes);
        let fs_path = self.join_segments(segments);
        if fs_path == self.root {
            return Err(AppError::MalformedRequest(format!(
                "invalid path {:?}",
                raw_path
            )));
        }
        self.resolve_filesystem(fs_path, &url_path)
    }

    #[cfg(not(unix))]
    fn resolve_raw(&self, raw_path: &str, _bytes: Vec<u8>) -> Result<Resolution> {
        Err(AppError::MalformedRequest(format!(
            "{:?} is not valid UTF-8",
            raw_path
        )))
    }

    fn resolve_filesystem(&self, fs_path: PathBuf, url_path: &str) -> Result<Resolution> {
        tracing::debug!(fs_path = %fs_path.display(), "Resolved filesystem path");

        let kind = classify(&fs_path)?;
        match kind {
            PathKind::File => {
                let media_type = self.assembler.mapper().media_type(&fs_path, kind);
                Ok(Resolution::File {
                    path: fs_path,
                    media_type,
                })
            }
            PathKind::DirectoryOfFiles | PathKind::DirectoryOfDirectories => {
                let feed = self
                    .assembler
                    .build_directory_feed(&fs_path, kind, url_path)?;
                Ok(Resolution::Feed {
                    kind: kind.feed_kind(),
                    feed,
                })
            }
        }
    }

    /// Join a decoded URL path onto the root without ever leaving it.
    pub fn filesystem_path(&self, url_path: &str) -> PathBuf {
        self.join_segments(url_path.split('/').map(OsStr::new))
    }

    fn join_segments<'a>(&self, parts: impl Iterator<Item = &'a OsStr>) -> PathBuf {
        let mut segments: Vec<&OsStr> = Vec::new();
        for segment in parts {
            if segment == ".." {
                segments.pop();
            } else if !segment.is_empty() && segment != "." {
                segments.push(segment);
            }
        }

        let mut path = self.root.clone();
        path.extend(segments);
        path
    }
}

/// Percent-decode a request path.
///
/// Every `%` must start a two-digit hex escape and the result must be
/// UTF-8 without NUL bytes.
pub fn decode_request_path(raw: &str) -> Result<String> {
    String::from_utf8(decode_request_bytes(raw)?)
        .map_err(|e| AppError::MalformedRequest(format!("{:?}: {}", raw, e)))
}

/// Percent-decode a request path to raw bytes; empty becomes `/`.
fn decode_request_bytes(raw: &str) -> Result<Vec<u8>> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(AppError::MalformedRequest(format!(
                    "invalid escape in {:?}",
                    raw
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let decoded = urlencoding::decode_binary(bytes);

    if decoded.contains(&0) {
        return Err(AppError::MalformedRequest(format!(
            "NUL byte in {:?}",
            raw
        )));
    }

    if decoded.is_empty() {
        return Ok(b"/".to_vec());
    }

    Ok(decoded.into_owned())
}
