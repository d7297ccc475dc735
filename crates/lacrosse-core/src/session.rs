// ── Session manager ──
//
// Owns the login state for the one portal account. The session key, once
// obtained, is treated as valid until a fetch proves otherwise; there is
// no proactive renewal. No retries happen here -- retry policy belongs to
// the refresh coordinator.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use lacrosse_api::{Credentials, LoginDiscovery, PortalClient};

use crate::error::CoreError;

/// Read-only view of the session for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub obtained_at: Option<DateTime<Utc>>,
    pub cookie_name: Option<String>,
    pub cookie_lifetime_years: Option<u32>,
    /// Login attempts made since the manager was created.
    pub login_attempts: u64,
}

#[derive(Debug, Default)]
struct Session {
    authenticated: bool,
    obtained_at: Option<DateTime<Utc>>,
    discovery: Option<LoginDiscovery>,
    login_attempts: u64,
}

/// Login state plus the protocol to (re)establish it.
///
/// The session cookie itself lives in the client's cookie jar, which every
/// outgoing request shares.
pub struct SessionManager {
    client: PortalClient,
    credentials: Credentials,
    // Held across the login round-trips so concurrent callers never log in twice.
    state: Mutex<Session>,
}

impl SessionManager {
    pub fn new(client: PortalClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            state: Mutex::new(Session::default()),
        }
    }

    /// The portal client whose cookie jar carries the session.
    pub fn client(&self) -> &PortalClient {
        &self.client
    }

    /// Log in unless a session is already established.
    pub async fn ensure_authenticated(&self) -> Result<(), CoreError> {
        let mut session = self.state.lock().await;
        if session.authenticated {
            return Ok(());
        }

        session.login_attempts += 1;
        debug!(attempt = session.login_attempts, "logging in to portal");

        match self.client.authenticate(&self.credentials).await {
            Ok(discovery) => {
                session.authenticated = true;
                session.obtained_at = Some(Utc::now());
                session.discovery = Some(discovery);
                info!(user = %self.credentials.username, "portal session established");
                Ok(())
            }
            Err(e) => {
                session.authenticated = false;
                warn!(error = %e, user = %self.credentials.username, "portal login failed");
                Err(e.into())
            }
        }
    }

    /// Forget the session; the next `ensure_authenticated` logs in again.
    pub async fn invalidate(&self) {
        let mut session = self.state.lock().await;
        if session.authenticated {
            debug!("session invalidated");
        }
        session.authenticated = false;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.authenticated
    }

    pub async fn info(&self) -> SessionInfo {
        let session = self.state.lock().await;
        SessionInfo {
            authenticated: session.authenticated,
            obtained_at: session.obtained_at,
            cookie_name: session.discovery.as_ref().map(|d| d.cookie_name.clone()),
            cookie_lifetime_years: session.discovery.as_ref().map(|d| d.cookie_lifetime_years),
            login_attempts: session.login_attempts,
        }
    }
}
