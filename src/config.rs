// config.rs
use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;

use crate::db::cache::{QUICK_STATS_CACHE_TTL, SEARCH_CACHE_TTL, TREND_CACHE_TTL};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Expiry, in seconds, of each cached payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub search: usize,
    pub trend: usize,
    pub quick_stats: usize,
}

impl Default for CacheTtl {
    fn default() -> Self {
        CacheTtl {
            search: SEARCH_CACHE_TTL,
            trend: TREND_CACHE_TTL,
            quick_stats: QUICK_STATS_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// No database url means the in-memory store.
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    /// CSV loaded into the in-memory store at startup.
    pub seed_csv_path: Option<String>,
    pub port: u16,
    pub db_max_connections: u32,
    pub allowed_origins: Vec<String>,
    pub cache_ttl: CacheTtl,
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// Unparseable numbers fall back to the default.
fn parsed<T: FromStr>(name: &str, default: T) -> T {
    match optional(name) {
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("{} has an invalid value {:?}, using the default", name, raw);
            default
        }),
        None => default,
    }
}

impl Config {
    /// Read before `init` so the subscriber is up when config warnings fire.
    pub fn log_level() -> LevelFilter {
        optional("LOG_LEVEL")
            .and_then(|level| level.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::DEBUG)
    }

    pub fn init() -> Config {
        let defaults = CacheTtl::default();

        let allowed_origins = optional("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:5173".to_string(),
                    "http://localhost:8000".to_string(),
                ]
            });

        Config {
            database_url: optional("DATABASE_URL"),
            redis_url: optional("REDIS_URL"),
            seed_csv_path: optional("SEED_CSV_PATH"),
            port: parsed("PORT", DEFAULT_PORT),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            allowed_origins,
            cache_ttl: CacheTtl {
                search: parsed("SEARCH_CACHE_TTL", defaults.search),
                trend: parsed("TREND_CACHE_TTL", defaults.trend),
                quick_stats: parsed("QUICK_STATS_CACHE_TTL", defaults.quick_stats),
            },
        }
    }
}
