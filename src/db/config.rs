use std::time::Duration;

use crate::config::{env_string, env_u64};

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env_string("DATABASE_URL"),
            max_connections: env_u64("DB_MAX_CONNECTIONS")
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(10),
            acquire_timeout: Duration::from_millis(
                env_u64("DB_ACQUIRE_TIMEOUT_MS").unwrap_or(5000),
            ),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}
