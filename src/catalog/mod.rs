//! Request-to-feed resolution over a directory tree.
//!
//! A request path is either one of the virtual collections (`/`,
//! `/latest`, `/titles`) or a path under the catalog root. Directories
//! become feeds, files are handed back to the transport to stream.

mod assemble;
mod classify;
mod index;
mod metadata;
mod resolve;

pub use assemble::FeedAssembler;
pub use classify::{PathKind, classify};
pub use index::{CatalogIndex, ContentEntry, Snapshot};
pub use metadata::MetadataMapper;
pub use resolve::{FeedResolver, Resolution, decode_request_path};

/// Entry title for a file name. Names that are not UTF-8 are shown lossily;
/// their hrefs still carry the raw bytes.
fn display_name(name: &std::ffi::OsStr) -> String {
    let lossy = name.to_string_lossy();
    if name.to_str().is_none() {
        tracing::warn!(name = %lossy, "File name is not valid UTF-8");
    }
    lossy.into_owned()
}
