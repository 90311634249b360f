use super::{ContentEntry, MetadataMapper, PathKind, classify};
use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::opds::{Author, Entry, Feed, FeedKind, Link, NAVIGATION_TYPE, Relation};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Builds feed documents for the resolver.
#[derive(Clone)]
pub struct FeedAssembler {
    root: PathBuf,
    title: String,
    author: Author,
    mapper: MetadataMapper,
    clock: Arc<dyn Clock>,
}

impl FeedAssembler {
    /// Create an assembler for the catalog rooted at `root`.
    pub fn new(
        root: PathBuf,
        title: impl Into<String>,
        author: Author,
        mapper: MetadataMapper,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            root,
            title: title.into(),
            author,
            mapper,
            clock,
        }
    }

    /// Metadata mapper used for entry links.
    pub fn mapper(&self) -> &MetadataMapper {
        &self.mapper
    }

    /// The root feed: always exactly the `Latest` and `By Title` entries.
    pub fn build_root_feed(&self) -> Feed {
        let mut feed = self.header("/", FeedKind::Navigation);
        feed.entries = vec![
            self.virtual_collection("/latest", "Latest"),
            self.virtual_collection("/titles", "By Title"),
        ];
        feed
    }

    /// One entry per indexed file, in the given order.
    ///
    /// Each entry is classified again at request time. Files that have
    /// disappeared since the snapshot was taken are left out.
    pub fn build_virtual_feed(
        &self,
        entries: &[&ContentEntry],
        request_path: &str,
    ) -> Result<Feed> {
        let mut feed = self.header(request_path, FeedKind::Acquisition);

        for content in entries {
            let Some(kind) = classify_present(&content.path)? else {
                continue;
            };
            let href = self.href(&content.path);
            let id = format!("{}{}", request_path, href);
            feed.entries
                .push(self.entry(id, &content.name, &content.path, kind, href));
        }

        Ok(feed)
    }

    /// One entry per immediate child of `dir`, sorted by file name.
    pub fn build_directory_feed(
        &self,
        dir: &Path,
        kind: PathKind,
        request_path: &str,
    ) -> Result<Feed> {
        let mut feed = self.header(request_path, kind.feed_kind());

        let mut children = std::fs::read_dir(dir)
            .map_err(|e| AppError::from_fs(dir, e))?
            .map(|child| child.map(|c| c.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| AppError::from_fs(dir, e))?;
        children.sort();

        for child in children {
            let Some(kind) = classify_present(&child)? else {
                continue;
            };
            let name = child
                .file_name()
                .map(super::display_name)
                .unwrap_or_default();
            let href = self.href(&child);
            feed.entries
                .push(self.entry(href.clone(), &name, &child, kind, href));
        }

        Ok(feed)
    }

    /// Feed metadata shared by every document.
    fn header(&self, request_path: &str, kind: FeedKind) -> Feed {
        let segment = request_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let title = if segment.is_empty() {
            self.title.clone()
        } else {
            title_case(segment)
        };

        Feed {
            id: request_path.to_string(),
            title,
            author: self.author.clone(),
            updated: self.clock.now(),
            links: vec![
                Link {
                    rel: "self".to_string(),
                    href: request_path.to_string(),
                    link_type: kind.media_type().to_string(),
                    title: None,
                },
                Link {
                    rel: "start".to_string(),
                    href: "/".to_string(),
                    link_type: NAVIGATION_TYPE.to_string(),
                    title: None,
                },
            ],
            entries: Vec::new(),
        }
    }

    fn virtual_collection(&self, href: &str, title: &str) -> Entry {
        let now = self.clock.now();
        Entry {
            id: href.to_string(),
            title: title.to_string(),
            updated: now,
            published: now,
            link: Link {
                rel: Relation::Subsection.as_str().to_string(),
                href: href.to_string(),
                link_type: NAVIGATION_TYPE.to_string(),
                title: Some(title.to_string()),
            },
        }
    }

    fn entry(&self, id: String, name: &str, path: &Path, kind: PathKind, href: String) -> Entry {
        let now = self.clock.now();
        Entry {
            id,
            title: name.to_string(),
            updated: now,
            published: now,
            link: self.mapper.link(path, kind, href, name),
        }
    }

    /// URL path of `path` relative to the catalog root, one encoded segment at a time.
    pub fn href(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(encode_segment(s)),
                _ => None,
            })
            .collect();

        format!("/{}", segments.join("/"))
    }
}

/// Percent-encode one path segment from its raw bytes.
#[cfg(unix)]
fn encode_segment(segment: &OsStr) -> String {
    use std::os::unix::ffi::OsStrExt;
    urlencoding::encode_binary(segment.as_bytes()).into_owned()
}

#[cfg(not(unix))]
fn encode_segment(segment: &OsStr) -> String {
    urlencoding::encode(&segment.to_string_lossy()).into_owned()
}

/// Classify, treating a vanished path as absent rather than an error.
fn classify_present(path: &Path) -> Result<Option<PathKind>> {
    match classify(path) {
        Ok(kind) => Ok(Some(kind)),
        Err(AppError::NotFound(_)) => {
            tracing::debug!(path = %path.display(), "Entry vanished, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Upper-case the first letter of every word.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;

    for c in text.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        word_start = !(c.is_alphanumeric() || c == '_');
    }

    out
}
