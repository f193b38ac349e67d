//! shapedex daemon entry point.
//!
//! Boots the store against its collaborators (triple store, SHACL
//! validator, search engine), performs the startup imports, and keeps the
//! scheduled profile sync running until shutdown.

mod bootstrap;
mod config;
mod schedule;

use clap::Parser;
use config::Args;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log_filter()))
        .init();

    let app = bootstrap::build(&args);
    if let Err(err) = bootstrap::bootstrap(&app, &args).await {
        error!(error = %err, "startup failed");
        std::process::exit(1);
    }

    let _sync_task = if args.cron.is_empty() {
        None
    } else {
        match schedule::spawn_scheduled_sync(app.synchronizer.clone(), &args.cron) {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!(error = %err, cron = %args.cron, "invalid sync schedule");
                std::process::exit(1);
            }
        }
    };

    info!("shapedex is running");
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed waiting for shutdown signal");
    }
    info!("shutting down");
}
