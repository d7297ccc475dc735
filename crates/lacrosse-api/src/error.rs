use thiserror::Error;

/// Top-level error type for the `lacrosse-api` crate.
///
/// Covers every failure mode of the portal: bootstrap discovery, login,
/// transport, session staleness, and page parsing. `lacrosse-core` maps
/// these into its own cloneable error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Login ───────────────────────────────────────────────────────
    /// The bootstrap script did not contain one of the login patterns.
    #[error("Bootstrap script is missing the {missing} pattern")]
    BootstrapParse { missing: &'static str },

    /// Login was rejected or did not yield a session key.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status on a request that expected 2xx.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// A page GET kept redirecting.
    #[error("Too many redirects fetching {url}")]
    TooManyRedirects { url: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Session ─────────────────────────────────────────────────────
    /// The status page came back without the logged-in marker.
    #[error("Session expired -- status page lacks logged-in marker")]
    StaleSession,

    // ── Data ────────────────────────────────────────────────────────
    /// The status page did not match the expected shape.
    #[error("Status page parse error: {message}")]
    PageParse { message: String },

    /// The embedded device JSON failed to decode, with the raw text for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the session should be thrown
    /// away before the next request.
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::HttpStatus { .. }
                | Self::TooManyRedirects { .. }
                | Self::StaleSession
        )
    }

    /// Returns `true` if a fresh login followed by a refetch may succeed.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::StaleSession)
    }
}
