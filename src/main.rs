mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::{Config, NotificationMode, StorageBackend};
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::{db::{DBClient, Storage}, memorydb::MemoryStore};
use service::{
    gig_service::GigService,
    health::BackendHealth,
    hire_service::HireService,
    notification_service::{ConnectionHub, DiscardDispatcher, NotificationDispatcher},
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<dyn Storage>,
    pub hub: Arc<ConnectionHub>,
    pub health: Arc<BackendHealth>,
    pub gig_service: Arc<GigService>,
    pub hire_service: Arc<HireService>,
}

impl AppState {
    pub fn new(db_client: Arc<dyn Storage>, config: Config) -> Self {
        let hub = Arc::new(ConnectionHub::new());
        let health = Arc::new(BackendHealth::new(config.degraded_after_failures));

        let dispatcher: Arc<dyn NotificationDispatcher> = match config.notification_mode {
            NotificationMode::Push => hub.clone(),
            NotificationMode::Poll => Arc::new(DiscardDispatcher),
        };

        let gig_service = Arc::new(GigService::new(db_client.clone()));
        let hire_service = Arc::new(HireService::new(
            db_client.clone(),
            dispatcher,
            health.clone(),
            Duration::from_millis(config.hire_timeout_ms),
        ));

        Self {
            env: config,
            db_client,
            hub,
            health,
            gig_service,
            hire_service,
        }
    }
}

async fn connect_storage(config: &Config) -> Arc<dyn Storage> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("⚠️  Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Postgres => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            let pool = match PgPoolOptions::new()
                .max_connections(20)
                .min_connections(2)
                .acquire_timeout(Duration::from_millis(config.hire_timeout_ms))
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    tracing::info!("✅ Connection to the database is successful!");
                    pool
                }
                Err(err) => {
                    tracing::error!("🔥 Failed to connect to the database: {:?}", err);
                    std::process::exit(1);
                }
            };

            if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
                tracing::error!("🔥 Failed to run migrations: {:?}", err);
                std::process::exit(1);
            }

            Arc::new(DBClient::new(pool))
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("🔥 Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::DEBUG))
        .init();

    let db_client = connect_storage(&config).await;

    let allowed_origins = vec![
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://localhost:8000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state).layer(cors);

    tracing::info!(
        "🚀 Server is running on http://localhost:{} (storage: {}, notifications: {})",
        config.port,
        config.storage_backend.to_str(),
        config.notification_mode.to_str()
    );

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {}", err);
    }
}
