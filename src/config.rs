use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::db::config::DbConfig;
use crate::services::examples::ExampleConfig;
use crate::services::media::MediaConfig;
use crate::services::quiz::QuizConfig;
use crate::services::speech::SpeechConfig;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub max_upload_bytes: usize,
    pub db: DbConfig,
    pub media: MediaConfig,
    pub speech: SpeechConfig,
    pub examples: ExampleConfig,
    pub quiz: QuizConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let max_upload_bytes = env_u64("MAX_UPLOAD_BYTES")
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self {
            host,
            port,
            log_level,
            max_upload_bytes,
            db: DbConfig::from_env(),
            media: MediaConfig::from_env(),
            speech: SpeechConfig::from_env(),
            examples: ExampleConfig::from_env(),
            quiz: QuizConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.trim().parse().ok()
}

pub(crate) fn env_f64(key: &str) -> Option<f64> {
    env_string(key)?.trim().parse().ok()
}
