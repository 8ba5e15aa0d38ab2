mod alert;
mod balance;
mod classifier;
mod config;
mod db;
mod error;
mod extractor;
mod models;
mod monitor;
mod rpc;
mod window;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Solana outflow monitor starting...");

    // Missing required configuration is fatal; nothing to monitor without it.
    let cfg = config::load()?;

    // Run migrations once at startup.
    {
        let conn = db::connect(&cfg.db_path)?;
        db::run_migrations(&conn)?;
    }

    let conn = db::connect(&cfg.db_path)?;
    let ledger = rpc::HttpLedgerRpc::new(&cfg.rpc_http_url)?;
    let sink = alert::WebhookSink::new(&cfg.webhook_url)?;

    let monitor_handle = tokio::spawn(monitor::run(cfg, conn, ledger, sink));

    tokio::select! {
        res = monitor_handle => match res {
            Ok(Ok(())) => info!("monitor exited cleanly"),
            Ok(Err(e)) => error!("monitor error: {e:?}"),
            Err(e) => error!("monitor task panicked: {e:?}"),
        },
        _ = signal::ctrl_c() => {
            info!("shutdown signal received, stopping...");
        }
    }

    info!("Solana outflow monitor stopped.");
    Ok(())
}
