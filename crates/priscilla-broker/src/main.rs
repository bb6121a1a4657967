use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use priscilla_broker::{logging, server, BrokerInvoker, Dispatcher};
use priscilla_core::PriscillaConfig;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD: &str = match option_env!("PRISCILLA_BUILD") {
    Some(sha) => sha,
    None => "development",
};

#[derive(Parser, Debug)]
#[command(name = "priscilla", about = "Chat message broker for adapters and responders")]
struct Cli {
    /// Path to the configuration file (YAML, or TOML with a .toml extension).
    #[arg(short, long)]
    conf: Option<PathBuf>,

    /// Print version and build, then exit.
    #[arg(short, long)]
    version: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("Version: {VERSION}");
        println!("Build: {BUILD}");
        return Ok(());
    }

    let path = cli.conf.context("need to specify a configuration file with --conf")?;
    let config = PriscillaConfig::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    logging::init(&config)?;

    let responders = match priscilla_responders::compile(&config) {
        Ok(r) => r,
        Err(e) => {
            error!(code = e.code(), error = %e, "responder configuration rejected");
            return Err(e.into());
        }
    };
    if config.secret.is_empty() {
        warn!("no secret configured, engagement is not authenticated");
    }

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(version = VERSION, build = BUILD, addr = %addr, "priscilla starting");

    let (dispatcher, submit) = Dispatcher::new(responders, Arc::new(BrokerInvoker::new()), config.secret.clone());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let actor = tokio::spawn(dispatcher.run(shutdown_rx.clone()));
    let accept = tokio::spawn(server::accept_loop(listener, submit, shutdown_rx));

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    warn!("termination requested");
    let _ = shutdown_tx.send(true);
    let _ = accept.await;
    let _ = actor.await;
    info!("exited normally");
    Ok(())
}
