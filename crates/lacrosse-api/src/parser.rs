// Portal response parsing
//
// Every pattern the portal is scraped with lives here. All functions are
// pure: raw text in, typed result or `Error` out.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;

use crate::auth::LoginDiscovery;
use crate::error::Error;
use crate::models::{RawDevice, StatusPage};

static PRODUCT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"var\s+prodKey\s*=\s*"([^"]+)""#).expect("PRODUCT_KEY_RE should compile")
});
static SERVICE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"var\s+serviceURL\s*=[^"]*"([^"]+)""#).expect("SERVICE_URL_RE should compile")
});
static SESSION_COOKIE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"setCookie\(\s*"([^"]+)"\s*,\s*response\.sessionKey\s*,\s*(\d+)"#)
        .expect("SESSION_COOKIE_RE should compile")
});
static LOGGED_IN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^userProviderID = ").expect("LOGGED_IN_RE should compile")
});
static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^userProviderID\s=\s(\d+);userGatewaysList\s=\s'([^']*)';var\sisMetric\s=\s(\d);var\sdevicesInitData\s=\s(.*\}\});var\srefreshInt",
    )
    .expect("STATUS_RE should compile")
});

/// Pull the login parameters out of the bootstrap script.
pub fn parse_login_discovery(script: &str) -> Result<LoginDiscovery, Error> {
    let product_key = capture(&PRODUCT_KEY_RE, script, 1).ok_or(Error::BootstrapParse {
        missing: "prodKey",
    })?;
    let service_url = capture(&SERVICE_URL_RE, script, 1).ok_or(Error::BootstrapParse {
        missing: "serviceURL",
    })?;
    let cookie = SESSION_COOKIE_RE
        .captures(script)
        .ok_or(Error::BootstrapParse {
            missing: "setCookie",
        })?;
    let cookie_name = cookie.get(1).map(|m| m.as_str().to_owned());
    let lifetime_years = cookie.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
    let (Some(cookie_name), Some(cookie_lifetime_years)) = (cookie_name, lifetime_years) else {
        return Err(Error::BootstrapParse {
            missing: "setCookie",
        });
    };

    Ok(LoginDiscovery {
        product_key,
        service_url,
        cookie_name,
        cookie_lifetime_years,
    })
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionKey")]
    session_key: Option<String>,
}

/// Extract the session key from the body of the login redirect.
pub fn parse_login_response(body: &str) -> Result<SecretString, Error> {
    let resp: LoginResponse = serde_json::from_str(body).map_err(|e| Error::Authentication {
        message: format!("login response is not JSON: {e}"),
    })?;
    match resp.session_key {
        Some(key) if !key.is_empty() => Ok(SecretString::from(key)),
        _ => Err(Error::Authentication {
            message: "login response has no session key".into(),
        }),
    }
}

/// Does the page carry the marker that only appears when logged in?
pub fn has_session_marker(page: &str) -> bool {
    LOGGED_IN_RE.is_match(page)
}

/// Parse the status page into account info and devices.
///
/// Devices keep the order the portal lists them in.
pub fn parse_status_page(page: &str) -> Result<StatusPage, Error> {
    let caps = STATUS_RE.captures(page).ok_or_else(|| Error::PageParse {
        message: "status page does not match the expected layout".into(),
    })?;

    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    let provider_id = group(1).parse::<u64>().map_err(|e| Error::PageParse {
        message: format!("bad userProviderID {:?}: {e}", group(1)),
    })?;
    let gateway_ids = group(2)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    let is_metric = group(3) != "0";

    let raw = group(4);
    let by_key: IndexMap<String, RawDevice> =
        serde_json::from_str(raw).map_err(|e| Error::Deserialization {
            message: format!("devicesInitData: {e}"),
            body: raw.to_owned(),
        })?;

    Ok(StatusPage {
        provider_id,
        gateway_ids,
        is_metric,
        devices: by_key.into_values().collect(),
    })
}

fn capture(re: &Regex, text: &str, group: usize) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(group))
        .map(|m| m.as_str().to_owned())
}
