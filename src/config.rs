use crate::error::AppError;

use std::env;
use std::net::SocketAddr;

pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_CALL_RATE: f64 = 2.0;

/// Settings read once at startup from the environment (after `.env` is loaded).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Absent key is not fatal at startup; proxy requests fail with a 500 instead.
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
    pub bind_addr: SocketAddr,
    /// Rate applied when a profile has none configured.
    pub default_call_rate: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").ok_or(AppError::Config("DATABASE_URL not set"))?;
        let elevenlabs_api_key = lookup("ELEVENLABS_API_KEY").filter(|k| !k.trim().is_empty());
        let elevenlabs_base_url = lookup("ELEVENLABS_BASE_URL")
            .unwrap_or_else(|| DEFAULT_ELEVENLABS_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|_| AppError::Config("BIND_ADDR is not a socket address"))?;
        let default_call_rate = match lookup("DEFAULT_CALL_RATE") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|r| r.is_finite() && *r >= 0.0)
                .ok_or(AppError::Config("DEFAULT_CALL_RATE is not a non-negative number"))?,
            None => DEFAULT_CALL_RATE,
        };

        Ok(Self {
            database_url,
            elevenlabs_api_key,
            elevenlabs_base_url,
            bind_addr,
            default_call_rate,
        })
    }
}
