/*!
 * Configuration
 * Runtime settings read from the environment (after `.env` is loaded)
 */
use std::net::SocketAddr;

/// Id of the distinguished admin identity unless `ADMIN_USER_ID` says otherwise.
pub const DEFAULT_ADMIN_USER_ID: i64 = 1;

/// bcrypt refuses costs outside this range.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_busy_timeout_secs: u64,
    pub admin_user_id: i64,
    pub bcrypt_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5002,
            database_url: "sqlite:posts.db".to_string(),
            db_max_connections: 5,
            db_busy_timeout_secs: 5,
            admin_user_id: DEFAULT_ADMIN_USER_ID,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bcrypt_cost = env_parse::<u32>("BCRYPT_COST")
            .map(|cost| cost.clamp(*BCRYPT_COST_RANGE.start(), *BCRYPT_COST_RANGE.end()))
            .unwrap_or(defaults.bcrypt_cost);

        Self {
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: env_parse("DB_POOL_MAX").unwrap_or(defaults.db_max_connections),
            db_busy_timeout_secs: env_parse("DB_BUSY_TIMEOUT")
                .unwrap_or(defaults.db_busy_timeout_secs),
            admin_user_id: env_parse("ADMIN_USER_ID").unwrap_or(defaults.admin_user_id),
            bcrypt_cost,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid HOST/PORT configuration: {e}"))
    }
}
