mod protocol;

use std::sync::Arc;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tsw_provider::{Error, ProviderConfig, ResourceRegistry, Session};

use crate::protocol::Plugin;

#[tokio::main]
async fn main() {
    // Stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    // Also loads .env if present
    let mut plugin = match ProviderConfig::from_env() {
        Ok(config) => {
            let session = Session::new(config).expect("invalid provider configuration");
            let registry = ResourceRegistry::new(Arc::new(session));
            tracing::info!(resources = ?registry.types(), "teraswitch provider configured from environment");
            Plugin::with_registry(registry)
        }
        Err(Error::MissingConfig(_)) => {
            tracing::info!("TSW_API_TOKEN not set, waiting for configure request");
            Plugin::default()
        }
        Err(e) => panic!("failed to load provider configuration: {e}"),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling in-flight operation");
            on_signal.cancel();
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    if let Err(e) = protocol::serve(&mut plugin, stdin, stdout, &cancel).await {
        tracing::error!(error = %e, "protocol stream failed");
        std::process::exit(1);
    }
}
