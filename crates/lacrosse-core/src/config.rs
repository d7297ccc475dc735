// ── Runtime portal configuration ──
//
// Describes *how* to reach the portal and how long cached readings stay
// good. Carries credentials, never touches disk. `lacrosse-config` builds
// one of these from files and the environment.

use std::time::Duration;

pub use lacrosse_api::auth::DEFAULT_LOGIN_SCHEME;
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Portal root used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://lacrossealertsmobile.com/v1.2";

/// Default cache window, in seconds.
pub const DEFAULT_CACHE_SECS: u64 = 30;

/// Configuration for one portal account.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Portal root, always ending in `/`.
    pub base_url: Url,
    /// Account e-mail address.
    pub username: String,
    pub password: SecretString,
    /// How long a successful refresh is served from cache.
    pub cache_window: Duration,
    /// Per-request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    /// Scheme for the protocol-relative login service URL.
    pub login_scheme: String,
}

impl PortalConfig {
    /// Config for the default portal with the default cache window.
    pub fn new(username: impl Into<String>, password: SecretString) -> Result<Self, CoreError> {
        Ok(Self {
            base_url: normalize_base_url(DEFAULT_BASE_URL)?,
            username: username.into(),
            password,
            cache_window: Duration::from_secs(DEFAULT_CACHE_SECS),
            timeout: None,
            login_scheme: DEFAULT_LOGIN_SCHEME.into(),
        })
    }

    /// Point at a different portal root. A missing trailing `/` is added.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, CoreError> {
        self.base_url = normalize_base_url(raw)?;
        Ok(self)
    }

    pub fn with_cache_window(mut self, window: Duration) -> Self {
        self.cache_window = window;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the login scheme. Only test portals served over plain
    /// HTTP need this.
    pub fn with_login_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.login_scheme = scheme.into();
        self
    }
}

/// Parse a portal root, making sure it ends with `/` so relative joins
/// stay underneath it.
pub fn normalize_base_url(raw: &str) -> Result<Url, CoreError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|e| CoreError::Config {
        message: format!("invalid base URL {raw:?}: {e}"),
    })
}
