use secrecy::{ExposeSecret, SecretString};
use url::{Host, Url};

use crate::error::Error;

/// Scheme given to a protocol-relative service URL unless overridden.
pub const DEFAULT_LOGIN_SCHEME: &str = "https";

/// Account credentials for the portal login form.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account e-mail address (`iLogEmail`).
    pub username: String,
    /// Account password (`iLogPass`).
    pub password: SecretString,
}

/// Login parameters discovered from the bootstrap script.
///
/// The portal rotates these without notice, so they are scraped on every
/// login instead of being configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDiscovery {
    /// Product key, sent as the `pkey` query parameter.
    pub product_key: String,
    /// Backend service URL, usually protocol-relative (`//host/path/`).
    pub service_url: String,
    /// Name of the cookie the browser would store the session key under.
    pub cookie_name: String,
    /// Cookie lifetime in years, as passed to the page's `setCookie`.
    pub cookie_lifetime_years: u32,
}

impl LoginDiscovery {
    /// The login endpoint: `{service}user-api.php?pkey=..&action=userlogin`.
    ///
    /// A protocol-relative service URL gets `scheme` (normally
    /// [`DEFAULT_LOGIN_SCHEME`]); an absolute one is used as-is.
    pub fn login_url(&self, scheme: &str) -> Result<Url, Error> {
        let service = if self.service_url.starts_with("//") {
            format!("{scheme}:{}", self.service_url)
        } else {
            self.service_url.clone()
        };
        let mut url = Url::parse(&service)?.join("user-api.php")?;
        url.query_pairs_mut()
            .append_pair("pkey", &self.product_key)
            .append_pair("action", "userlogin");
        Ok(url)
    }

    /// Max-Age for the session cookie, in seconds.
    pub fn cookie_max_age_secs(&self) -> u64 {
        u64::from(self.cookie_lifetime_years) * 365 * 24 * 60 * 60
    }

    /// Build the `Set-Cookie` string the portal's own script would set.
    ///
    /// Scoped to the base URL's host. IP hosts get a host-only cookie
    /// because cookie stores reject `Domain=` on IP literals.
    pub fn session_cookie(&self, session_key: &SecretString, base_url: &Url) -> String {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path=/",
            self.cookie_name,
            session_key.expose_secret(),
            self.cookie_max_age_secs()
        );
        if let Some(Host::Domain(domain)) = base_url.host() {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        cookie
    }
}
