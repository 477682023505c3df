use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkmap::collection::{Collector, CollectorSettings};
use linkmap::config::Config;
use linkmap::db::Store;
use linkmap::parsers::{CommandCatalog, ParserRegistry};
use linkmap::ssh::SshOpener;
use linkmap::topology::LinkInference;
use linkmap::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring malformed .env: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkmap=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::load();
    tracing::info!("Starting LinkMap");
    tracing::info!("Database: {}", cfg.db_path);
    tracing::info!("Listen: {}", cfg.listen_addr);

    let store = Store::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?;
    tracing::info!("Database initialized (pool_size={})", cfg.db_max_connections);

    match store.recover_interrupted_attempts().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Marked {} interrupted collection attempts as failed", n),
        Err(e) => tracing::warn!("Failed to recover interrupted attempts: {}", e),
    }

    let registry = ParserRegistry::with_defaults();
    let mut catalog = CommandCatalog::from_registry(&registry);
    if let Some(path) = &cfg.command_catalog_path {
        catalog.load_overrides(path).await;
    }

    let inference = Arc::new(LinkInference::new(store.clone(), cfg.neighbor_match));
    let collector = Arc::new(Collector::new(
        store.clone(),
        registry,
        catalog,
        Arc::new(SshOpener),
        inference.clone(),
        CollectorSettings::from_config(&cfg),
    ));
    tracing::info!(
        "Collector ready (workers={}, neighbor_match={:?})",
        cfg.batch_workers,
        inference.policy()
    );

    let state = Arc::new(AppState {
        store,
        collector,
        inference,
    });

    let app = router::build(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("LinkMap listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("LinkMap shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
