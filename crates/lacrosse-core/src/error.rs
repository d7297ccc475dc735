// ── Core error types ──
//
// User-facing errors from lacrosse-core. Consumers never see HTTP status
// codes or regex failures directly. The `From<lacrosse_api::Error>` impl
// translates portal-layer errors into the refresh taxonomy.
//
// `CoreError` is `Clone` so a single refresh outcome can be handed to every
// caller that joined the cycle.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Login errors ─────────────────────────────────────────────────
    #[error("Login discovery failed: {message}")]
    Bootstrap { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Fetch errors ─────────────────────────────────────────────────
    #[error("Cannot reach portal: {message}")]
    Transport { message: String },

    #[error("Session expired -- re-authentication required")]
    StaleSession,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Status page could not be parsed: {message}")]
    PageParse { message: String },

    #[error("Portal returned no usable devices")]
    EmptyResult,

    #[error("Device not found: {name}")]
    DeviceNotFound { name: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Refresh cycle ended without reporting an outcome")]
    RefreshAbandoned,
}

impl CoreError {
    /// Returns `true` if a later refresh has a fair chance of succeeding
    /// without any change on the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::StaleSession | Self::RefreshAbandoned
        )
    }

    /// Returns `true` if this failure throws the session away.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::StaleSession)
    }
}

// ── Conversion from portal-layer errors ──────────────────────────────

impl From<lacrosse_api::Error> for CoreError {
    fn from(err: lacrosse_api::Error) -> Self {
        match err {
            lacrosse_api::Error::BootstrapParse { missing } => CoreError::Bootstrap {
                message: format!("bootstrap script is missing the {missing} pattern"),
            },
            lacrosse_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            lacrosse_api::Error::Transport(e) => CoreError::Transport {
                message: e.to_string(),
            },
            lacrosse_api::Error::HttpStatus { status, url } => CoreError::Transport {
                message: format!("HTTP {status} from {url}"),
            },
            lacrosse_api::Error::TooManyRedirects { url } => CoreError::Transport {
                message: format!("too many redirects fetching {url}"),
            },
            lacrosse_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            lacrosse_api::Error::StaleSession => CoreError::StaleSession,
            lacrosse_api::Error::PageParse { message } => CoreError::PageParse { message },
            lacrosse_api::Error::Deserialization { message, body: _ } => {
                CoreError::PageParse { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_onto_refresh_taxonomy() {
        let err = CoreError::from(lacrosse_api::Error::BootstrapParse { missing: "prodKey" });
        assert!(matches!(err, CoreError::Bootstrap { ref message } if message.contains("prodKey")));

        let err = CoreError::from(lacrosse_api::Error::HttpStatus {
            status: 502,
            url: "http://portal/".into(),
        });
        assert!(matches!(err, CoreError::Transport { .. }));
        assert!(err.invalidates_session());

        let err = CoreError::from(lacrosse_api::Error::Deserialization {
            message: "eof".into(),
            body: "{".into(),
        });
        assert!(matches!(err, CoreError::PageParse { .. }));
        assert!(!err.invalidates_session());
        assert!(!err.is_retryable());
    }

    #[test]
    fn stale_session_is_retryable() {
        let err = CoreError::from(lacrosse_api::Error::StaleSession);
        assert!(err.is_retryable());
        assert!(err.invalidates_session());
        assert!(!CoreError::EmptyResult.is_retryable());
    }
}
