//! flatdb Server Binary
//!
//! Starts the TCP server for flatdb.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use flatdb::network::Server;
use flatdb::{Authenticator, Config, StorageEngine};

/// flatdb Server
#[derive(Parser, Debug)]
#[command(name = "flatdb-server")]
#[command(about = "Networked flat-file record store")]
#[command(version)]
struct Args {
    /// JSON configuration file with HOST, PORT, and DATA_FOLDER
    #[arg(short, long)]
    config: Option<String>,

    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Listen address host:port (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Per-connection read timeout in milliseconds (0 = none)
    #[arg(long, default_value = "30000")]
    read_timeout_ms: u64,

    /// Per-connection write timeout in milliseconds (0 = none)
    #[arg(long, default_value = "30000")]
    write_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flatdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.into();
    }
    if let Some(listen) = &args.listen {
        config.listen_addr = listen.clone();
    }
    config.max_connections = args.max_connections;
    config.read_timeout_ms = args.read_timeout_ms;
    config.write_timeout_ms = args.write_timeout_ms;

    tracing::info!("flatdb v{}", flatdb::VERSION);
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Listen address: {}", config.listen_addr);

    let storage = Arc::new(StorageEngine::new(config.data_dir.clone()));
    let auth = Arc::new(Authenticator::new());

    let server = match Server::bind(config, storage, auth) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
