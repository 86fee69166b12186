use axum::http::HeaderValue;
use axum::Router;
use std::panic;
use std::sync::Arc;
use syncdoc::config::{self, Config};
use syncdoc::db::dbdocs::DbDocs;
use syncdoc::db::memstore::MemStore;
use syncdoc::db::store::DocStore;
use syncdoc::docs::ApiDoc;
use syncdoc::handlers;
use syncdoc::routes::api::{create_api_routes, create_ws_routes};
use syncdoc::services::rate_limit::RateLimiter;
use syncdoc::ws::registry::RoomRegistry;
use syncdoc::AppState;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "syncdoc=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let app_config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Initialize global configuration
    if let Err(e) = config::init_config(app_config) {
        error!("Failed to initialize global configuration: {}", e);
        return;
    }

    let config = config::get_config();

    if config.auth_jwt_secret.is_none() {
        warn!("auth_jwt_secret not configured - all authenticated requests will fail");
    }

    // Initialize the document store
    let store: Arc<dyn DocStore> = match &config.db_url {
        Some(db_url) => match DbDocs::new(db_url).await {
            Ok(db) => {
                info!("Database initialized successfully");
                Arc::new(db)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to in-memory store - documents will not survive restarts");
                Arc::new(MemStore::new())
            }
        },
        None => {
            warn!("No database URL configured - using in-memory store");
            Arc::new(MemStore::new())
        }
    };

    // Room registry for the realtime collaboration plane
    let registry = Arc::new(RoomRegistry::new(store.clone()));

    let state = AppState {
        store,
        registry,
        rate_limiter: Arc::new(RateLimiter::new(config.mutation_rate_limit_per_minute)),
    };

    // Combine all routes
    let mut app_routes = Router::new()
        .route("/health", axum::routing::get(handlers::health_check))
        .route("/ready", axum::routing::get(handlers::ready_check))
        // Mount API routes
        .nest("/api", create_api_routes(state.clone()))
        // Mount the realtime channel
        .merge(create_ws_routes(state))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http());

    // Apply CORS when origins are configured
    if let Some(origins) = &config.cors_origins {
        let parsed: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        app_routes = app_routes.layer(CorsLayer::new().allow_origin(parsed));
    }

    // Start the HTTP/API server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!(
        "📡 Realtime channel available at ws://{}/ws",
        config.server_address()
    );
    info!(
        "📚 Swagger UI available at http://{}/swagger",
        config.server_address()
    );

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
