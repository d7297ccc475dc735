// Shared transport configuration for building the portal's reqwest::Client.
//
// The portal client and the login flow must share one cookie jar, and the
// login step must see redirect responses rather than follow them.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::redirect;

const DEFAULT_USER_AGENT: &str = concat!("lacrosse-web/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout. `None` keeps reqwest's default (no timeout).
    pub timeout: Option<Duration>,
    pub user_agent: String,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.into(),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// Redirects are never followed: the login endpoint signals success
    /// with a 302 whose body carries the session key.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .redirect(redirect::Policy::none());

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder.build().map_err(crate::error::Error::Transport)
    }

    /// Create a config with a fresh cookie jar (for session auth).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }

    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_timeout_and_no_jar() {
        let config = TransportConfig::default();
        assert!(config.timeout.is_none());
        assert!(config.cookie_jar.is_none());
        assert!(config.user_agent.starts_with("lacrosse-web/"));
    }

    #[test]
    fn with_cookie_jar_installs_a_fresh_jar() {
        let config = TransportConfig::default()
            .with_cookie_jar()
            .with_timeout(Duration::from_secs(5));
        assert!(config.cookie_jar.is_some());
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(config.build_client().is_ok());
    }
}
