//! Entry point for the ataxx match server.
//!
//! ```text
//! ataxx-server                  Serve one match with defaults
//! ataxx-server --config <path>  Load a custom config TOML
//! ataxx-server --port 9000      Override the listening port
//! ataxx-server --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ataxx_server::{MatchServer, ServerConfig};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ataxx-server", about = "Two-player ataxx match server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "ataxx-server.toml")]
    config: PathBuf,

    /// Port to listen on, overriding the config file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ServerConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(bind) = cli.bind {
        config.network.bind = bind;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("ataxx-server v{}", env!("CARGO_PKG_VERSION"));
    info!("turn timeout: {} ms", config.game.turn_timeout_ms);
    info!("layout: {:?}", config.game.layout);
    info!("framing: {:?}", config.protocol.framing);

    let server = MatchServer::new(config);
    let stop = server.stop_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {e}");
            return;
        }
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    match server.run().await? {
        Some(report) => info!("match over: {report}"),
        None => info!("no match played"),
    }
    Ok(())
}
