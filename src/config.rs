use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Serve a directory tree as an OPDS catalog.
#[derive(Parser, Debug, Clone)]
#[command(name = "dir-opds")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "DIROPDS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Directory to publish as the catalog root.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Create a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Catalog configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Identity written into every feed header.
    #[serde(default)]
    pub author: AuthorConfig,

    /// MIME type associations.
    #[serde(default)]
    pub mime: MimeConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        8080,
    )
}

/// Catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory published at `/`.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Title of the root feed.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            title: default_title(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_title() -> String {
    "Catalog".to_string()
}

/// Feed author identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorConfig {
    /// Author name.
    #[serde(default)]
    pub name: String,

    /// Author email.
    #[serde(default)]
    pub email: String,

    /// Author home page.
    #[serde(default)]
    pub uri: String,
}

/// MIME configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MimeConfig {
    /// Read the host's `mime.types` files.
    #[serde(default = "default_system_mime")]
    pub system: bool,

    /// Extra `".ext" = "type"` associations, applied last.
    #[serde(default)]
    pub types: BTreeMap<String, String>,
}

impl Default for MimeConfig {
    fn default() -> Self {
        Self {
            system: default_system_mime(),
            types: BTreeMap::new(),
        }
    }
}

fn default_system_mime() -> bool {
    true
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> crate::error::Result<Self> {
        toml::from_str(content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("dir-opds.toml"),
            dirs::config_dir()
                .map(|p| p.join("dir-opds").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/dir-opds/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Canonicalize the catalog root, rejecting anything but a directory.
    pub fn resolve_root(&self) -> crate::error::Result<PathBuf> {
        let root = self.catalog.root.canonicalize().map_err(|e| {
            crate::error::AppError::Config(format!(
                "Catalog root {} is not accessible: {}",
                self.catalog.root.display(),
                e
            ))
        })?;

        if !root.is_dir() {
            return Err(crate::error::AppError::Config(format!(
                "Catalog root is not a directory: {}",
                root.display()
            )));
        }

        Ok(root)
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# dir-opds configuration

[server]
bind = "0.0.0.0:8080"

[catalog]
# Directory published as the catalog
root = "."
title = "Catalog"

[author]
name = ""
email = ""
uri = ""

[mime]
# Read /etc/mime.types and similar files
system = true

# Extra associations, applied after everything else
[mime.types]
# ".azw3" = "application/vnd.amazon.ebook"
# ".djvu" = "image/vnd.djvu"
"#
        .to_string()
    }
}
