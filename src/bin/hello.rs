//! `hello`: answers `/ping` and greets `/hello?name=X`.

use clap::Parser;

use rust_fileserver::config::{self, Config, Overrides};
use rust_fileserver::handler::Greeter;
use rust_fileserver::logger;
use rust_fileserver::server;

const ENV_PREFIX: &str = "HELLO";

#[derive(Parser, Debug)]
#[command(name = "hello", version, about = "Greeter service")]
struct Args {
    /// Configuration file, looked up with any supported extension
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: String,

    #[arg(long)]
    host: Option<String>,

    #[arg(long, short)]
    port: Option<u16>,

    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let overrides = Overrides {
        host: args.host,
        port: args.port,
        log_level: args.log_level,
        ..Overrides::default()
    };

    let cfg = Config::load_from(&args.config, ENV_PREFIX, &overrides)?;
    logger::init(&cfg.logging.level)?;

    server::run("Greeter", cfg, Greeter)
}
