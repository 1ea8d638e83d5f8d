//! The `vellum` server binary: loads configuration, initializes
//! logging, and runs the single-threaded event loop (§1, §4.8).

use clap::Parser;
use tracing::error;
use vellum::{
    config::{max_list_size_from_env, Settings},
    database::Db,
    logging,
    network::{self, ServerOptions},
};

/// Command-line overrides for the `VELLUM_*` environment configuration
/// (§6). Flags take priority over environment variables.
#[derive(Debug, Parser)]
#[command(name = "vellum", about = "An in-memory, RESP-compatible key-value store")]
struct Cli {
    /// Address to listen on, e.g. 127.0.0.1:2000.
    #[arg(long)]
    listen_address: Option<String>,

    /// Soft cap on simultaneously open client connections.
    #[arg(long)]
    max_connections: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(addr) = cli.listen_address {
        settings.listen_address = addr;
    }
    if let Some(max) = cli.max_connections {
        settings.max_connections = max;
    }

    logging::init(&settings.log_level);

    let socket_addr = settings.socket_addr()?;
    let db = Db::new(max_list_size_from_env());

    let opts = ServerOptions {
        listen_address: socket_addr,
        max_connections: settings.max_connections,
    };

    if let Err(e) = network::run(opts, db) {
        error!(error = %e, "server exited with error");
        return Err(e.into());
    }

    Ok(())
}
