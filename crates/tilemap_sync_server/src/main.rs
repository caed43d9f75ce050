use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::get,
};
use std::sync::Arc;
use tilemap_core::{TileConfig, TileRegistry};
use tilemap_sync_server::{
    config::Config,
    db::Database,
    handlers::{ApiState, ROOM_HEADER, api_routes},
    sync::{FanOut, SyncService},
};
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tilemap_sync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Tilemap Sync Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {:?}", config.database_path);
    info!("Tile catalog: {:?}", config.tile_config_path);
    info!("CORS origins: {:?}", config.cors_origins);

    // Load the tile catalog
    let registry = match TileConfig::from_path(&config.tile_config_path)
        .and_then(|catalog| TileRegistry::load(&catalog))
    {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!("Failed to load tile catalog: {}", e);
            std::process::exit(1);
        }
    };

    match registry.geometry() {
        Ok(geometry) => info!(
            "Map {}x{} with {} layers, {} tiles",
            geometry.width,
            geometry.height,
            geometry.layers,
            registry.len()
        ),
        // Catch-up still works; init and submit answer 500.
        Err(e) => warn!("Tile catalog has no usable map size: {}", e),
    }

    // Initialize database
    let db = match Database::open(&config.database_path, config.sqlite_busy_timeout) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    // Create shared state
    let mut sync = SyncService::new(db, registry);
    if config.fanout_enabled {
        info!("Fan-out enabled (capacity {})", config.fanout_capacity);
        sync = sync.with_fanout(Arc::new(FanOut::new(config.fanout_capacity)));
    }

    let api_state = ApiState {
        sync: Arc::new(sync),
    };

    // Build CORS layer
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(ROOM_HEADER)])
        .allow_origin(AllowOrigin::list(origins));

    // Build the router
    let app = Router::new()
        // Health check
        .route("/", get(|| async { "Tilemap Sync Server" }))
        .route("/health", get(|| async { "OK" }))
        // API routes
        .nest("/api", api_routes(api_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.server_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", addr);

    // Run server with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
