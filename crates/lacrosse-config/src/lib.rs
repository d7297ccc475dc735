//! Configuration for La Crosse Alerts bridges.
//!
//! TOML file + `LACROSSE_` environment layering, credential resolution
//! (env var, keyring, plaintext), translation to
//! `lacrosse_core::PortalConfig`, and the `tracing` subscriber setup
//! hosts share.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use lacrosse_core::PortalConfig;
use lacrosse_core::config::{DEFAULT_BASE_URL, DEFAULT_CACHE_SECS, DEFAULT_LOGIN_SCHEME};

/// Keyring service name; entries are keyed by account e-mail.
const KEYRING_SERVICE: &str = "lacrosse-web";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured for the portal account")]
    NoCredentials { what: &'static str },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// On-disk configuration for one portal account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Portal root. Defaults to the public La Crosse Alerts portal.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Account e-mail address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password in plaintext. Prefer `password_env` or the keyring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Seconds a successful refresh is served from cache.
    #[serde(default = "default_cache_seconds", alias = "configCacheSeconds")]
    pub cache_seconds: u64,

    /// Per-request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Scheme for the portal's protocol-relative login service.
    #[serde(default = "default_login_scheme")]
    pub login_scheme: String,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            password: None,
            password_env: None,
            cache_seconds: default_cache_seconds(),
            timeout: None,
            login_scheme: default_login_scheme(),
            log_level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_cache_seconds() -> u64 {
    DEFAULT_CACHE_SECS
}
fn default_login_scheme() -> String {
    DEFAULT_LOGIN_SCHEME.into()
}
fn default_log_level() -> String {
    "info".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "lacrosse-web", "lacrosse-web").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("lacrosse-web");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the config from the canonical path plus the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` if it exists, then
/// `LACROSSE_*` environment variables (`LACROSSE_USERNAME`,
/// `LACROSSE_CACHE_SECONDS`, ...).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LACROSSE_"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), exists = path.exists(), "config loaded");
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// The account e-mail. Required.
pub fn resolve_username(cfg: &Config) -> Result<String, ConfigError> {
    cfg.username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_owned)
        .ok_or(ConfigError::NoCredentials { what: "username" })
}

/// Resolve the portal password: named env var, then keyring, then plaintext.
pub fn resolve_password(cfg: &Config, username: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var named by the config
    if let Some(ref env_name) = cfg.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, username) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = cfg.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials { what: "password" })
}

/// Build a `PortalConfig`, resolving credentials on the way.
pub fn to_portal_config(cfg: &Config) -> Result<PortalConfig, ConfigError> {
    let username = resolve_username(cfg)?;
    let password = resolve_password(cfg, &username)?;

    let invalid_url = |e: lacrosse_core::CoreError| ConfigError::Validation {
        field: "base_url".into(),
        reason: e.to_string(),
    };
    let mut portal = PortalConfig::new(username, password)
        .map_err(invalid_url)?
        .with_base_url(&cfg.base_url)
        .map_err(invalid_url)?
        .with_cache_window(Duration::from_secs(cfg.cache_seconds))
        .with_login_scheme(cfg.login_scheme.clone());
    if let Some(secs) = cfg.timeout {
        portal = portal.with_timeout(Duration::from_secs(secs));
    }
    Ok(portal)
}

// ── Logging ─────────────────────────────────────────────────────────

/// Install the global fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| ConfigError::Validation {
            field: "log_level".into(),
            reason: e.to_string(),
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))
}
