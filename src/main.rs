use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use http::HeaderValue;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing::{error, info};

use primefire_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        api::db::create_tables(&db).await.map_err(|e| {
            error!("Failed creating database schema: {}", e);
            e
        })?;
    }

    // Directory sync plumbing
    let graph = Arc::new(api::graph::GraphClient::from_config(&cfg));
    let directory_sync = Arc::new(api::services::sync::DirectorySync::new(
        graph.clone(),
        db.clone(),
        cfg.sync_domain_token.clone(),
    ));
    let scheduler = Arc::new(api::services::sync::SyncScheduler::new(
        directory_sync,
        cfg.sync_interval_hours,
    ));

    if cfg.sync_enabled {
        if cfg.graph_client_id.is_empty() || cfg.graph_client_secret.is_empty() {
            error!("Directory sync enabled but Graph credentials are not configured");
        } else {
            info!(
                interval_hours = cfg.sync_interval_hours,
                "Starting periodic directory sync"
            );
            scheduler.clone().spawn_periodic();
        }
    }

    let app_state = api::AppState {
        db,
        config: cfg.clone(),
        graph,
        sync: scheduler,
    };

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.is_development() {
        info!("Using permissive CORS (development environment)");
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration; set APP__CORS_ALLOWED_ORIGINS");
        anyhow::bail!("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS");
    };

    let app = api::build_router(app_state)
        .layer(CompressionLayer::new())
        .layer(cors_layer);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("primefire-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
