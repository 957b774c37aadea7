// Configuration module entry point
// Resolves the startup configuration once; it is immutable afterwards

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, Overrides, PerformanceConfig, ServerConfig, StorageConfig,
};

/// Default config file name, looked up without extension
pub const DEFAULT_CONFIG_FILE: &str = "config";

/// Default multipart ceiling: 32 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 32 << 20;

impl Config {
    /// Resolve configuration for one service.
    ///
    /// Precedence, highest first: `overrides` (command line), environment
    /// variables under `env_prefix` (nested keys joined by `__`, e.g.
    /// `FILESERVER_SERVER__PORT`), the optional file `config_path`, built-in
    /// defaults.
    pub fn load_from(
        config_path: &str,
        env_prefix: &str,
        overrides: &Overrides,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 9001)?
            .set_default("storage.path", "./data")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("http.max_upload_size", DEFAULT_MAX_UPLOAD_SIZE)?
            .set_default("http.server_name", "rust-fileserver")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 30)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.host", overrides.host.clone())?
            .set_override_option("server.port", overrides.port.map(i64::from))?
            .set_override_option(
                "storage.path",
                overrides
                    .storage_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("logging.level", overrides.log_level.clone())?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
