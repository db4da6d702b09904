use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::env;

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub session_key: Vec<u8>,
    pub enc_key: Vec<u8>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub mail: Option<MailConfig>,
    pub public_url: Option<String>,
    pub secure_cookies: bool,
    pub admin_bootstrap: Option<(String, String)>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL missing")?;

        let session_key = decode_key("SESSION_KEY")?;
        let enc_key = decode_key("APP_ENC_KEY")?;
        if enc_key.len() != 32 {
            return Err(anyhow!("APP_ENC_KEY must decode to 32 bytes"));
        }

        let bind_addr = optional("BIND_ADDR").unwrap_or_else(|| {
            let port = optional("PORT").unwrap_or_else(|| "3000".to_string());
            format!("0.0.0.0:{port}")
        });

        let openai_api_key = optional("OPENAI_API_KEY");
        if openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, career reports will be unavailable");
        }

        let mail = match (
            optional("MAIL_API_URL"),
            optional("MAIL_API_KEY"),
            optional("MAIL_FROM"),
        ) {
            (Some(api_url), Some(api_key), Some(from)) => Some(MailConfig {
                api_url,
                api_key,
                from,
            }),
            _ => {
                tracing::info!("Mail relay not configured, outgoing mail will be logged only");
                None
            }
        };

        let admin_bootstrap = optional("ADMIN_EMAIL").zip(optional("ADMIN_PASSWORD"));

        Ok(Self {
            database_url,
            bind_addr,
            session_key,
            enc_key,
            openai_api_key,
            openai_model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            mail,
            public_url: optional("PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()),
            secure_cookies: optional("PRODUCTION").is_some(),
            admin_bootstrap,
        })
    }

    /// Base URL for links sent by mail.
    pub fn link_base(&self) -> &str {
        self.public_url.as_deref().unwrap_or("http://localhost:3000")
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn decode_key(key: &str) -> Result<Vec<u8>> {
    let raw = env::var(key).with_context(|| format!("{key} missing"))?;
    general_purpose::STANDARD
        .decode(raw.trim())
        .with_context(|| format!("{key} must be base64"))
}
