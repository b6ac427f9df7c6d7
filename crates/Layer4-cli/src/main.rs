//! KodeRunner - Main entry point

mod logging;
mod server;
mod socket;

use clap::Parser;
use koderunner_core::{KodeRunner, PROTOCOL_VERSION};
use koderunner_foundation::KodeConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// KodeRunner - build and run code sent over WebSockets
#[derive(Parser, Debug)]
#[command(name = "koderunner")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Working root (defaults to KODERUNNER_ROOT, then ./koderunner)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Address to listen on (overrides ServerURL / ServerPort)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Directory served as the web UI
    #[arg(long)]
    html_root: Option<PathBuf>,

    /// Directory scanned for runnable manifests
    #[arg(long)]
    runnables_dir: Option<PathBuf>,

    /// Log to stderr only
    #[arg(long)]
    no_file_log: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = KodeConfig::load(args.root)?;
    if let Some(html) = args.html_root {
        config.html_root = Some(html);
    }
    if let Some(dir) = args.runnables_dir {
        config.dirs.runnables = dir.to_string_lossy().into_owned();
    }
    config.ensure_layout()?;

    let log_dir = (!args.no_file_log).then(|| config.logs_dir());
    logging::init(args.debug, log_dir.as_deref())?;

    let addr = match args.bind {
        Some(addr) => addr,
        None => config.bind_addr()?,
    };

    info!(
        "KodeRunner {} (protocol {})",
        env!("CARGO_PKG_VERSION"),
        PROTOCOL_VERSION
    );
    info!(root = %config.root_dir.display(), "Working root");

    let runner = KodeRunner::start(config).await;
    info!(
        "Loaded {} runnables",
        runner.registry().snapshot().len()
    );

    server::serve(runner, addr).await
}
