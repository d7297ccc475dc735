// Portal HTTP client
//
// Wraps `reqwest::Client` with the portal's URL layout and a shared cookie
// jar. The login flow lives in `login.rs` as inherent methods so this
// module stays focused on transport mechanics.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::LOCATION;
use tracing::{debug, trace};
use url::Url;

use crate::auth::DEFAULT_LOGIN_SCHEME;
use crate::error::Error;
use crate::models::StatusPage;
use crate::parser;
use crate::transport::TransportConfig;

/// Path of the script that carries the login parameters, relative to the base URL.
pub const BOOTSTRAP_PATH: &str = "resources/js/dd/account-enhanced.js?ver=11";

/// Redirect hops `get_text` follows before giving up.
const MAX_REDIRECTS: usize = 10;

/// Raw HTTP client for the La Crosse Alerts portal.
///
/// Every request goes through the same cookie jar, so a session cookie
/// installed by [`authenticate`](Self::authenticate) is sent on every later
/// fetch. The transport never follows redirects on its own: the login POST
/// needs to see its 302, while page GETs follow them in [`get_text`](Self::get_text).
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: Url,
    cookie_jar: Arc<Jar>,
    login_scheme: String,
}

impl PortalClient {
    /// Create a new portal client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically. `base_url` must end with `/` so relative joins land
    /// under it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let cookie_jar = transport
            .cookie_jar
            .clone()
            .unwrap_or_else(|| Arc::new(Jar::default()));
        let config = TransportConfig {
            cookie_jar: Some(Arc::clone(&cookie_jar)),
            ..transport.clone()
        };
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            cookie_jar,
            login_scheme: DEFAULT_LOGIN_SCHEME.into(),
        })
    }

    /// Scheme for a protocol-relative login service URL (default `https`).
    pub fn with_login_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.login_scheme = scheme.into();
        self
    }

    /// The underlying HTTP client (for auth flows that need direct access).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The portal base URL. Also the status page.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn login_scheme(&self) -> &str {
        &self.login_scheme
    }

    /// The shared cookie jar.
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.cookie_jar
    }

    /// The `Cookie` header that would be sent to the portal, if any.
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookie_jar.cookies(&self.base_url)?;
        cookies.to_str().ok().map(String::from)
    }

    /// URL of the bootstrap script.
    pub fn bootstrap_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join(BOOTSTRAP_PATH)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// GET a page and return its body, following redirects. A final
    /// non-2xx status is an error.
    pub async fn get_text(&self, mut url: Url) -> Result<String, Error> {
        for _ in 0..=MAX_REDIRECTS {
            debug!("GET {}", url);

            let resp = self.http.get(url.clone()).send().await?;
            let status = resp.status();
            if status.is_redirection() {
                if let Some(next) = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|loc| url.join(loc).ok())
                {
                    debug!(status = status.as_u16(), "redirected to {}", next);
                    url = next;
                    continue;
                }
            }
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = resp.text().await?;
            trace!(bytes = body.len(), "GET {} OK", url);
            return Ok(body);
        }

        Err(Error::TooManyRedirects {
            url: url.to_string(),
        })
    }

    /// GET the status page and confirm it was served to a logged-in session.
    pub async fn fetch_status_page(&self) -> Result<String, Error> {
        let body = self.get_text(self.base_url.clone()).await?;
        if !parser::has_session_marker(&body) {
            debug!(
                preview = %body.chars().take(200).collect::<String>(),
                "status page lacks logged-in marker"
            );
            return Err(Error::StaleSession);
        }
        Ok(body)
    }

    /// Fetch and parse the status page in one go.
    pub async fn fetch_status(&self) -> Result<StatusPage, Error> {
        let body = self.fetch_status_page().await?;
        parser::parse_status_page(&body)
    }
}
