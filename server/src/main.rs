use axum::{
    extract::FromRef,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use felchat_server::{
    config::{Config, RuntimeEnv},
    delivery::ChatService,
    directory::{MemoryDirectory, UserDirectory},
    handlers, health,
    history::{ChatHistory, MemoryHistory, RedisHistory},
    metrics,
    realtime,
};

// Composite state for Axum
#[derive(Clone, FromRef)]
struct AppState {
    chat: Arc<ChatService>,
    config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "felchat_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting Felchat chat server");

    let config = Arc::new(Config::from_env());

    // Initialize metrics
    let metrics_recorder = metrics::MetricsRecorder::new();
    let metrics_handle = metrics_recorder.handle().clone();
    tracing::info!("Metrics initialized");

    // History backend selected by environment, matching the repository
    // selector of the original deployment: Redis in prod, in-memory in test.
    let history: Arc<dyn ChatHistory> = match config.env {
        RuntimeEnv::Prod => {
            let store = RedisHistory::connect(&config.redis_url, config.retention()).await?;
            tracing::info!(url = %config.redis_url, "Connected Redis history store");
            Arc::new(store)
        }
        RuntimeEnv::Test => {
            tracing::info!("Using in-memory history store");
            Arc::new(MemoryHistory::new(config.retention()))
        }
    };

    // Bootstrap-mode user directory. A deployment with a real user service
    // swaps in its own UserDirectory implementation here.
    let directory: Arc<dyn UserDirectory> = Arc::new(MemoryDirectory::new());

    let chat = Arc::new(ChatService::new(
        history,
        Some(directory),
        config.history_limit,
    ));

    let app_state = AppState {
        chat,
        config: config.clone(),
    };

    let metrics_router = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = Router::new()
        // Health check endpoints
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Live chat channel
        .route("/ws/chat", get(realtime::chat_ws))
        // Chat API
        .route(
            "/api/chat/history",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route("/api/chat/history/count", get(handlers::message_count))
        .route("/api/chat/online", get(handlers::online_users))
        .route("/api/chat/block-status", get(handlers::block_status))
        .merge(metrics_router)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
