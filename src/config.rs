// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Agent configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default table the field reports are inserted into.
pub const REPORTS_TABLE: &str = "activity_reports";

/// Which queue store adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process only, lost on restart
    Memory,
    /// JSON files under `queue_dir`
    File,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            _ => Err(ConfigError::Invalid("QUEUE_STORE", s.to_string())),
        }
    }
}

/// Agent configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Backend ---
    /// Supabase project URL (e.g. https://xyz.supabase.co)
    pub supabase_url: String,
    /// Public anon key, sent as `apikey`
    pub supabase_anon_key: String,
    /// Bearer token for inserts; falls back to the anon key
    pub supabase_access_token: Option<String>,
    /// Table receiving submitted reports
    pub reports_table: String,

    // --- Local server ---
    /// Server port
    pub port: u16,
    /// Shell origin allowed by CORS
    pub frontend_url: String,

    // --- Queue ---
    pub queue_store: StoreBackend,
    pub queue_dir: PathBuf,
    pub queue_max_records: Option<usize>,

    // --- Sync policy ---
    pub sync_interval: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Transport timeout for a single submission
    pub submit_timeout: Duration,
    /// Optional reachability probe target (HEAD)
    pub ping_url: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            supabase_url: "http://127.0.0.1:9".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            supabase_access_token: None,
            reports_table: REPORTS_TABLE.to_string(),
            port: 8787,
            frontend_url: "http://localhost:5173".to_string(),
            queue_store: StoreBackend::Memory,
            queue_dir: PathBuf::from("data/pending_reports"),
            queue_max_records: None,
            sync_interval: Duration::from_secs(30),
            max_retries: 10,
            backoff_base: Duration::from_secs(30),
            backoff_max: Duration::from_secs(30 * 60),
            submit_timeout: Duration::from_secs(30),
            ping_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            supabase_access_token: optional_var("SUPABASE_ACCESS_TOKEN"),
            reports_table: env::var("REPORTS_TABLE").unwrap_or_else(|_| REPORTS_TABLE.to_string()),
            port: parse_var("PORT", 8787)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            queue_store: match optional_var("QUEUE_STORE") {
                Some(v) => v.parse()?,
                None => StoreBackend::File,
            },
            queue_dir: env::var("QUEUE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/pending_reports")),
            queue_max_records: match optional_var("QUEUE_MAX_RECORDS") {
                Some(v) => Some(
                    v.parse()
                        .map_err(|_| ConfigError::Invalid("QUEUE_MAX_RECORDS", v))?,
                ),
                None => None,
            },
            sync_interval: Duration::from_secs(require_nonzero(
                "SYNC_INTERVAL_SECS",
                parse_var("SYNC_INTERVAL_SECS", 30)?,
            )?),
            max_retries: require_nonzero("MAX_RETRIES", parse_var("MAX_RETRIES", 10)?)?,
            backoff_base: Duration::from_secs(parse_var("BACKOFF_BASE_SECS", 30)?),
            backoff_max: Duration::from_secs(parse_var("BACKOFF_MAX_SECS", 30 * 60)?),
            submit_timeout: Duration::from_secs(parse_var("SUBMIT_TIMEOUT_SECS", 30)?),
            ping_url: optional_var("PING_URL"),
        })
    }

    /// Token sent in the `Authorization` header.
    pub fn bearer_token(&self) -> &str {
        self.supabase_access_token
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }
}

/// Read a variable, treating empty values as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid(name, v)),
        None => Ok(default),
    }
}

/// Reject zero for settings where it would stall or disable syncing.
fn require_nonzero<T>(name: &'static str, value: T) -> Result<T, ConfigError>
where
    T: Default + PartialEq + ToString,
{
    if value == T::default() {
        return Err(ConfigError::Invalid(name, value.to_string()));
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
