//! dir-opds: publish a directory tree as an OPDS 1.1 catalog.
//!
//! Every request path is classified against the catalog root. Directories
//! holding files become acquisition feeds, directories holding only
//! directories become navigation feeds, and files are streamed as-is.
//!
//! # Features
//!
//! - Navigation and acquisition feeds derived from the directory layout
//! - `/latest` and `/titles` collections over the whole tree
//! - E-book and comic MIME types on top of the system `mime.types`
//! - Conditional requests and byte ranges

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Request classification and feed assembly.
pub mod catalog;
/// Time source for feed timestamps.
pub mod clock;
/// Configuration and CLI.
pub mod config;
/// Error types.
pub mod error;
/// Extension to MIME type table.
pub mod mime;
/// OPDS feed model and XML encoding.
pub mod opds;
/// HTTP server.
pub mod server;


pub use config::{Cli, Command, Config};
pub use error::{AppError, Result};
pub use server::AppState;
