mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use db::{
    cache::{MemoryCache, QueryCache, RedisCache},
    db::DBClient,
    memory::MemoryStore,
    store::BookingStore,
};
use dotenv::dotenv;
use routes::create_router;
use service::{
    comparison_service::ComparisonService, import_service::import_csv,
    location_service::LocationService, planner_service::PlannerService,
    search_service::SearchService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub cache: Arc<dyn QueryCache>,
    // Services
    pub search_service: Arc<SearchService>,
    pub comparison_service: Arc<ComparisonService>,
    pub planner_service: Arc<PlannerService>,
    pub location_service: Arc<LocationService>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn BookingStore>, cache: Arc<dyn QueryCache>) -> Self {
        let ttl = config.cache_ttl;

        let search_service = Arc::new(SearchService::new(store.clone(), cache.clone(), ttl));
        let comparison_service =
            Arc::new(ComparisonService::new(store.clone(), cache.clone(), ttl));
        let planner_service = Arc::new(PlannerService::new(store.clone(), cache.clone(), ttl));
        let location_service = Arc::new(LocationService::new(store));

        Self {
            env: config,
            cache,
            search_service,
            comparison_service,
            planner_service,
            location_service,
        }
    }
}

async fn connect_database(config: &Config, database_url: &str) -> anyhow::Result<DBClient> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to the database")?;
    tracing::info!("✅ Connection to the database is successful!");
    Ok(DBClient::new(pool))
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn BookingStore>> {
    if let Some(database_url) = &config.database_url {
        return Ok(Arc::new(connect_database(config, database_url).await?));
    }

    tracing::info!("ℹ️  DATABASE_URL not set - using the in-memory store");
    let store = MemoryStore::new();
    if let Some(path) = &config.seed_csv_path {
        let report = import_csv(path, Some(&store))
            .await
            .with_context(|| format!("Failed to seed the in-memory store from {}", path))?;
        tracing::info!("📦 Seeded {} bookings from {}", report.inserted, path);
    }
    Ok(Arc::new(store))
}

async fn open_cache(config: &Config) -> Arc<dyn QueryCache> {
    match &config.redis_url {
        Some(redis_url) => match RedisCache::connect(redis_url).await {
            Ok(cache) => {
                tracing::info!("✅ Redis caching is ACTIVE");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!("⚠️  Redis initialization error: {} - using in-process cache", e);
                Arc::new(MemoryCache::new())
            }
        },
        None => {
            tracing::info!("ℹ️  Redis not configured - using in-process cache (set REDIS_URL)");
            Arc::new(MemoryCache::new())
        }
    }
}

/// `stay-planner import <file.csv>`
async fn run_import(config: &Config, path: &str) -> anyhow::Result<()> {
    let report = match &config.database_url {
        Some(database_url) => {
            let client = connect_database(config, database_url).await?;
            import_csv(path, Some(&client)).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set - validating {} without loading it", path);
            import_csv(path, None).await
        }
    }
    .with_context(|| format!("Import of {} failed", path))?;

    println!(
        "{} rows read, {} inserted, {} skipped",
        report.rows, report.inserted, report.skipped
    );
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let cache = open_cache(&config).await;

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST]);

    let app_state = Arc::new(AppState::new(config.clone(), store, cache));
    let app = create_router(app_state.clone()).layer(cors);

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);
    tracing::info!("📊 Cache backend: {}", app_state.cache.backend());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(Config::log_level())
        .init();

    let config = Config::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [command, path] if command == "import" => run_import(&config, path).await,
        [command, ..] if command == "import" => {
            anyhow::bail!("usage: stay-planner import <file.csv>")
        }
        _ => serve(config).await,
    }
}
