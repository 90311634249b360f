//! Application state shared across handlers.

use crate::catalog::{CatalogIndex, FeedAssembler, FeedResolver, MetadataMapper};
use crate::clock::Clock;
use crate::config::Config;
use crate::mime::MimeTable;
use crate::opds::Author;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Request resolver over the catalog root.
    pub resolver: Arc<FeedResolver>,
    /// Source of the `Last-Modified` stamp on feeds.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the catalog for an already canonicalized `root`.
    pub fn new(config: Config, root: PathBuf, clock: Arc<dyn Clock>) -> Self {
        let mime = MimeTable::from_config(&config.mime);
        tracing::debug!(extensions = mime.len(), "MIME table ready");

        Self::with_mime(config, root, clock, mime)
    }

    /// Same as [`AppState::new`] with an explicit MIME table.
    pub fn with_mime(config: Config, root: PathBuf, clock: Arc<dyn Clock>, mime: MimeTable) -> Self {
        let author = Author {
            name: config.author.name.clone(),
            email: config.author.email.clone(),
            uri: config.author.uri.clone(),
        };

        let assembler = FeedAssembler::new(
            root.clone(),
            config.catalog.title.clone(),
            author,
            MetadataMapper::new(mime),
            Arc::clone(&clock),
        );
        let resolver = FeedResolver::new(root, Arc::new(CatalogIndex::new()), assembler);

        Self {
            resolver: Arc::new(resolver),
            clock,
        }
    }
}
