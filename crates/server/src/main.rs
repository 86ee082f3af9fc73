use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use indexhub_core::{
    config::config_path_from_env, load_config, native_registry, validate_config, AdapterContext,
    DirectoryDefinitionRepository, OrchestratorEvent, QueryOrchestrator, ReqwestTransport,
    SourceRegistry, TomlDefinitionInterpreter,
};
use indexhub_core::source::InMemorySettingsStore;
use indexhub_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = config_path_from_env();

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        native_sources = config.sources.len(),
        credentials = config.credentials.len(),
        definitions_dir = ?config.definitions.dir,
        "Configuration loaded successfully"
    );

    // Shared HTTP transport and settings; sessions and caches are per source
    let transport = ReqwestTransport::new(&config.http).context("Failed to create HTTP client")?;
    let settings = InMemorySettingsStore::from_config(&config.credentials);
    let ctx = AdapterContext::new(Arc::new(transport))
        .with_http(config.http.clone())
        .with_cache(config.cache.clone())
        .with_settings(Arc::new(settings));

    let mut registry = SourceRegistry::new(ctx, native_registry(&config.sources));
    if let Some(dir) = &config.definitions.dir {
        info!("Loading source definitions from {:?}", dir);
        registry = registry.with_definitions(
            Arc::new(DirectoryDefinitionRepository::new(dir)),
            Arc::new(TomlDefinitionInterpreter),
        );
    }

    let orchestrator = Arc::new(QueryOrchestrator::new(config.orchestrator.clone(), registry));

    // Initialize sources, logging each attempt
    let (init_tx, mut init_rx) = unbounded_channel();
    let init_logger = tokio::spawn(async move {
        while let Some(event) = init_rx.recv().await {
            match event {
                OrchestratorEvent::SourceInitProcessed(attempt) => match attempt.error {
                    Some(e) => warn!(source = %attempt.name, error = %e, "Source failed to initialize"),
                    None => info!(source = %attempt.name, "Source initialized"),
                },
                OrchestratorEvent::SourcesInitialized { count } => {
                    info!(count, "Sources ready")
                }
                _ => {}
            }
        }
    });
    let count = orchestrator.initialize(&init_tx).await;
    drop(init_tx);
    let _ = init_logger.await;
    if count == 0 {
        warn!("No source initialized; searches will return no results");
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
