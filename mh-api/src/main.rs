//! MouseHunt API - REST facade over the MouseHunt game endpoints

mod auth;
mod cli;
mod config;
mod error;
mod identity;
mod notify;
mod routes;

use clap::Parser;
use cli::Args;
use config::Config;
use error::ServerError;
use identity::IdentityStore;
use mh_http_client::MhClient;
use notify::LogNotifier;
use routes::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config = Config::from_args(args)?;

    let mut builder = MhClient::builder()
        .base_url(config.base_url.as_str())?
        .timeout(config.timeout);
    if let Some(marker) = &config.expired_marker {
        builder = builder.expired_marker(marker.clone());
    }
    let client = builder.build()?;

    let store = match &config.store_path {
        Some(path) => {
            log::info!("Identity store at {}", path.display());
            IdentityStore::open(path.clone())?
        }
        None => {
            log::info!("Identity store is in memory only");
            IdentityStore::in_memory()
        }
    };

    let state = AppState::new(client, store, Arc::new(LogNotifier), config.api_key);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
