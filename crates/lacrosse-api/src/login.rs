// Portal login
//
// The portal has no documented login API. The browser flow is replayed:
// scrape the bootstrap script for the product key, service URL and cookie
// parameters, post the login form, and plant the session cookie the
// page's own script would have set.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::auth::{Credentials, LoginDiscovery};
use crate::client::PortalClient;
use crate::error::Error;
use crate::parser;

impl PortalClient {
    /// Fetch the bootstrap script and extract the login parameters.
    pub async fn discover_login(&self) -> Result<LoginDiscovery, Error> {
        let url = self.bootstrap_url()?;
        let script = self.get_text(url).await?;
        let discovery = parser::parse_login_discovery(&script).inspect_err(|e| {
            warn!(error = %e, "login discovery failed");
        })?;
        debug!(
            cookie = %discovery.cookie_name,
            lifetime_years = discovery.cookie_lifetime_years,
            "discovered login parameters"
        );
        Ok(discovery)
    }

    /// Post the login form and return the session key.
    ///
    /// The portal answers a good login with a redirect whose body is JSON
    /// carrying `sessionKey`. Anything else is a failed login.
    pub async fn submit_login(
        &self,
        discovery: &LoginDiscovery,
        credentials: &Credentials,
    ) -> Result<SecretString, Error> {
        let url = discovery.login_url(self.login_scheme())?;

        debug!("logging in at {}", url.path());

        let form = [
            ("iLogEmail", credentials.username.as_str()),
            ("iLogPass", credentials.password.expose_secret()),
        ];
        let resp = self.http().post(url).form(&form).send().await?;

        let status = resp.status();
        if !status.is_redirection() {
            warn!(status = status.as_u16(), "login did not redirect");
            return Err(Error::Authentication {
                message: format!("login did not redirect (HTTP {status})"),
            });
        }

        let body = resp.text().await?;
        parser::parse_login_response(&body).inspect_err(|e| {
            warn!(error = %e, "login redirect carried no usable session key");
        })
    }

    /// Plant the session cookie in the shared jar.
    pub fn install_session_cookie(&self, discovery: &LoginDiscovery, session_key: &SecretString) {
        let cookie = discovery.session_cookie(session_key, self.base_url());
        self.cookie_jar().add_cookie_str(&cookie, self.base_url());
        debug!(cookie = %discovery.cookie_name, "session cookie installed");
    }

    /// Run the full login: discover, submit, install the cookie.
    ///
    /// Nothing is installed unless every step succeeds.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<LoginDiscovery, Error> {
        let discovery = self.discover_login().await?;
        let session_key = self.submit_login(&discovery, credentials).await?;
        self.install_session_cookie(&discovery, &session_key);
        debug!("login successful");
        Ok(discovery)
    }
}
