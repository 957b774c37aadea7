//! `fileserver`: upload, list, download, replace and delete files in one
//! flat directory over HTTP.

use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use rust_fileserver::config::{self, Config, Overrides};
use rust_fileserver::handler::FileServer;
use rust_fileserver::logger;
use rust_fileserver::server;
use rust_fileserver::storage::FileStore;

/// Environment variable prefix, e.g. `FILESERVER_SERVER__PORT=8080`
const ENV_PREFIX: &str = "FILESERVER";

#[derive(Parser, Debug)]
#[command(name = "fileserver", version, about = "Flat-directory file server")]
struct Args {
    /// Configuration file, looked up with any supported extension
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: String,

    /// Address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,

    /// Directory holding the stored files
    #[arg(long)]
    storage_path: Option<PathBuf>,

    /// Log filter, e.g. `info` or `rust_fileserver=debug`
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let overrides = Overrides {
        host: args.host,
        port: args.port,
        storage_path: args.storage_path,
        log_level: args.log_level,
    };

    let cfg = Config::load_from(&args.config, ENV_PREFIX, &overrides)?;
    logger::init(&cfg.logging.level)?;

    let store = FileStore::open(&cfg.storage.path).inspect_err(|e| {
        error!(path = %cfg.storage.path.display(), "Cannot open storage directory: {e}");
    })?;

    let service = FileServer::new(store, cfg.http.max_upload_size);
    server::run("File server", cfg, service)
}
