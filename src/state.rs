use crate::config::AppConfig;
use crate::crypto::PersonalDataCipher;
use crate::db::PgStore;
use crate::middleware::RateLimiter;
use crate::services::ai::TextGenerator;
use crate::services::mailer::Mailer;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: PgStore,
    pub cipher: Arc<PersonalDataCipher>,
    /// `None` when no generation credential is configured.
    pub ai: Option<Arc<dyn TextGenerator>>,
    pub mailer: Mailer,
    pub session_key: Vec<u8>,
    pub login_limiter: RateLimiter,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn generator(&self) -> Option<&dyn TextGenerator> {
        self.ai.as_deref()
    }
}

pub type SharedState = Arc<AppState>;
