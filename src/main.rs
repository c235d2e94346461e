use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pairchat::chat::repository::{
    ChatRepository, InMemoryChatRepository, PostgresChatRepository,
};
use pairchat::chat::{chat_socket_handler, create_room, list_user_rooms, RoomRegistry};
use pairchat::shared::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pairchat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pairchat server");

    // Persistence backend: Postgres when DATABASE_URL is set, in-memory otherwise
    let repository: Arc<dyn ChatRepository + Send + Sync> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            info!("Using PostgreSQL repository");
            Arc::new(PostgresChatRepository::new(pool))
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory repository");
            Arc::new(InMemoryChatRepository::new())
        }
    };

    let registry = Arc::new(RoomRegistry::new());
    let app_state = AppState::new(repository, registry);

    let app = Router::new()
        .route("/", get(|| async { "pairchat" }))
        .route("/rooms", post(create_room))
        .route("/users/:username/rooms", get(list_user_rooms))
        .route("/ws", get(chat_socket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await.expect("Server error");
}
