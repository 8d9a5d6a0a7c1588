use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::services::selector::{DEFAULT_POOL_SIZE, STORY_POOL_SIZE};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Candidate pool for single-word review.
    pub review_pool_size: usize,
    /// Candidate pool for the multi-word story.
    pub story_pool_size: usize,
    pub seed_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            log_level: "info,sqlx=warn".to_string(),
            review_pool_size: DEFAULT_POOL_SIZE,
            story_pool_size: STORY_POOL_SIZE,
            seed_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);
        let host = env_parse("HOST").unwrap_or(defaults.host);
        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let review_pool_size = env_parse::<usize>("REVIEW_POOL_SIZE")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.review_pool_size);
        let story_pool_size = env_parse::<usize>("STORY_POOL_SIZE")
            .filter(|n| *n >= 3)
            .unwrap_or(defaults.story_pool_size);

        let seed_file = std::env::var("SEED_FILE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            log_level,
            review_pool_size,
            story_pool_size,
            seed_file,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.trim().parse().ok())
}
