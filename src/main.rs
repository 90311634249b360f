//! dir-opds server entry point.

use clap::Parser;
use dir_opds::{
    clock::FrozenClock,
    config::{Cli, Command, Config},
    server,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Some(Command::Init { force }) => cmd_init(force),
        Some(Command::Serve { bind, dir }) => cmd_serve(config, config_path, bind, dir).await,
        None => cmd_serve(config, config_path, None, None).await,
    }
}

/// Write a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());
    println!("\nSet [catalog] root to your books directory, then run: dir-opds serve");

    Ok(())
}

/// Start the server.
async fn cmd_serve(
    mut config: Config,
    config_path: Option<PathBuf>,
    bind: Option<std::net::SocketAddr>,
    dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(addr) = bind {
        config.server.bind = addr;
    }
    if let Some(dir) = dir {
        config.catalog.root = dir;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dir_opds=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root = config.resolve_root()?;
    let clock = FrozenClock::startup();

    tracing::info!(
        bind = %config.server.bind,
        root = %root.display(),
        config = ?config_path,
        "Starting dir-opds server"
    );

    let bind_addr = config.server.bind;
    let state = server::AppState::new(config, root, Arc::new(clock));
    let app = server::create_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(address = %bind_addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
