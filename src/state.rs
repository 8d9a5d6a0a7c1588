use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::auth::AuthConfig;
use crate::config::Config;
use crate::db::Database;
use crate::services::llm_provider::LlmProvider;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db: Database,
    llm: Arc<LlmProvider>,
    auth: Arc<AuthConfig>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, llm: LlmProvider, auth: AuthConfig, config: Config) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db,
            llm: Arc::new(llm),
            auth: Arc::new(auth),
            config: Arc::new(config),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn llm(&self) -> &LlmProvider {
        &self.llm
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
