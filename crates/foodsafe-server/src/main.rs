use anyhow::Result;
use chrono::Utc;
use foodsafe_storage::ComplianceStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use foodsafe_server::app;
use foodsafe_server::config;
use foodsafe_server::materializer::OccurrenceScheduler;
use foodsafe_server::seed;
use foodsafe_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  foodsafe-server [config.toml]                         Start the server");
    eprintln!("  foodsafe-server init-seed <config.toml> <seed.json>   Import templates/rules/expectations from seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    foodsafe_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("foodsafe=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-seed") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-seed requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-seed requires <seed.json> argument")
            })?;
            run_init_seed(config_path, seed_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

/// Import templates, rules and expectations from a JSON seed file.
async fn run_init_seed(config_path: &str, seed_path: &str) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;
    std::fs::create_dir_all(&config.database.data_dir)?;
    let store = ComplianceStore::new(&config.database.connection_url()).await?;
    seed::init_from_seed_file(&store, seed_path).await
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        db = %config.database.redacted_url(),
        "foodsafe-server starting"
    );

    // Build components
    std::fs::create_dir_all(&config.database.data_dir)?;
    let store = Arc::new(ComplianceStore::new(&config.database.connection_url()).await?);

    let state = AppState {
        store: store.clone(),
        start_time: Utc::now(),
        config: Arc::new(config.clone()),
    };

    // HTTP/REST server
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state.clone());
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(http_listener, app);

    // Occurrence materialization scheduler
    let scheduler_handle = if config.materializer.enabled {
        let scheduler = OccurrenceScheduler::new(store.clone(), config.materializer.tick_secs);
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Occurrence scheduler disabled");
        None
    };

    tracing::info!(http = %http_addr, "Server started");

    tokio::select! {
        result = http_server.with_graceful_shutdown(async { signal::ctrl_c().await.ok(); }) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    if let Some(h) = scheduler_handle {
        h.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
