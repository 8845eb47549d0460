// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then a TOML file,
//! then `SECRETS_`-prefixed environment variables (nested with `__`, e.g.
//! `SECRETS_AUTH__MODE=one-way-hash`). The bare `SECRET` variable is also
//! accepted as the encryption key.
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::auth::codec::{StorageMode, DEFAULT_COST_FACTOR, MAX_COST_FACTOR, MIN_COST_FACTOR};
use crate::auth::session::MAX_SESSION_TTL_SECS;
use crate::error::AppError;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "secrets.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "SECRETS_";

/// Legacy variable holding the encryption key
pub const LEGACY_SECRET_ENV: &str = "SECRET";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_level: String,
    pub log_format: LogFormat,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Secret storage settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Active storage mode
    pub mode: StorageMode,
    /// Base64-encoded 32-byte key, required by `reversible-encryption`
    pub secret_key: Option<String>,
    /// scrypt cost (log2 of N) for `one-way-hash`
    pub cost_factor: u8,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("mode", &self.mode)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("cost_factor", &self.cost_factor)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

/// Credential storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Data directory used by the file backend
    pub data_dir: PathBuf,
}

/// Login lockout settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Failed logins before a client is locked out
    pub max_attempts: u32,
    /// Lockout duration in seconds
    pub lockout_secs: u64,
    /// Key clients by the `x-real-ip` header instead of the peer address.
    /// Only enable behind a proxy that sets it.
    pub trust_proxy_header: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            session_ttl_secs: 60 * 60 * 24, // 1 day
            auth: AuthSettings::default(),
            storage: StorageSettings::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode: StorageMode::OneWayHash,
            secret_key: None,
            cost_factor: DEFAULT_COST_FACTOR,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 5 * 60,
            trust_proxy_header: false,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `secrets.toml`) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        Self::figment(path)
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// The provider stack used by `load`.
    ///
    /// The default file is optional; an explicitly given one must exist.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = match path {
            Some(path) => Toml::file_exact(path),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };

        Figment::new()
            .merge(file)
            .merge(
                Env::raw()
                    .only(&[LEGACY_SECRET_ENV])
                    .map(|_| "auth.secret_key".into()),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        if self.session_ttl_secs == 0 || self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(AppError::Config(format!(
                "session_ttl_secs must be between 1 and {MAX_SESSION_TTL_SECS}"
            )));
        }
        if self.auth.mode == StorageMode::OneWayHash
            && !(MIN_COST_FACTOR..=MAX_COST_FACTOR).contains(&self.auth.cost_factor)
        {
            return Err(AppError::Config(format!(
                "auth.cost_factor must be between {MIN_COST_FACTOR} and {MAX_COST_FACTOR}"
            )));
        }
        if self.rate_limit.max_attempts == 0 {
            return Err(AppError::Config(
                "rate_limit.max_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
