// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it results live in memory only.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub rust_log: String,
    pub log_dir: String,
    pub fetch_timeout: Duration,
    /// Deadline for the locked upsert + rank section of an evaluation.
    pub repository_timeout: Duration,
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            rust_log: "info".to_string(),
            log_dir: "logs".to_string(),
            fetch_timeout: Duration::from_secs(20),
            repository_timeout: Duration::from_secs(10),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let default = Self::default();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        let bind_addr = env::var("BIND_ADDR").unwrap_or(default.bind_addr);

        let rust_log = env::var("RUST_LOG").unwrap_or(default.rust_log);

        let log_dir = env::var("LOG_DIR").unwrap_or(default.log_dir);

        let fetch_timeout = secs_var("FETCH_TIMEOUT_SECS")?.unwrap_or(default.fetch_timeout);

        let repository_timeout =
            secs_var("REPOSITORY_TIMEOUT_SECS")?.unwrap_or(default.repository_timeout);

        let allowed_origins = match env::var("ALLOWED_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => default.allowed_origins,
        };

        Ok(Self {
            database_url,
            bind_addr,
            rust_log,
            log_dir,
            fetch_timeout,
            repository_timeout,
            allowed_origins,
        })
    }
}

fn secs_var(name: &str) -> Result<Option<Duration>, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| AppError::Internal(format!("{} must be a number of seconds, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
