//! Entry point for the ataxx reference client.
//!
//! ```text
//! ataxx-client -u alice                     Play on 127.0.0.1:8080
//! ataxx-client -i 10.0.0.5 -p 9000 -u bob   Play on another server
//! ataxx-client -u carol --quiet             Do not print boards
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ataxx_client::{Session, SessionConfig};
use ataxx_core::{
    CodecConfig, Connection, ConnectionInfo, Framing, NoopRenderer, Renderer, TerminalRenderer,
};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ataxx-client", about = "Greedy ataxx player")]
struct Cli {
    /// Server host.
    #[arg(short = 'i', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Name to register under.
    #[arg(short, long)]
    username: String,

    /// Wire framing; must match the server.
    #[arg(long, value_enum, default_value_t = FramingArg::Lines)]
    framing: FramingArg,

    /// Delay before answering each turn, in milliseconds.
    #[arg(long, default_value_t = 0)]
    think_ms: u64,

    /// Do not print the board.
    #[arg(short, long)]
    quiet: bool,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FramingArg {
    Lines,
    LengthPrefixed,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Lines => Framing::Lines,
            FramingArg::LengthPrefixed => Framing::LengthPrefixed,
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = ConnectionInfo::new(cli.host, cli.port);
    let codec = CodecConfig {
        framing: cli.framing.into(),
        ..CodecConfig::default()
    };
    info!("connecting to {server}");
    let conn = Connection::connect(&server, codec).await?;

    let config = SessionConfig {
        username: cli.username.clone(),
        think: Duration::from_millis(cli.think_ms),
    };
    let renderer: Box<dyn Renderer> = if cli.quiet {
        Box::new(NoopRenderer)
    } else {
        Box::new(TerminalRenderer)
    };

    let summary = Session::new(conn, config, renderer).run().await?;
    match (&summary.winner, summary.draw) {
        (Some(winner), _) if summary.won(&cli.username) => info!("{winner} (us) won"),
        (Some(winner), _) => info!("{winner} won"),
        (None, true) => info!("draw"),
        (None, false) => info!("match ended without a result: {}", summary.reason),
    }
    for (name, score) in &summary.scores {
        info!("  {name}: {score}");
    }
    Ok(())
}
