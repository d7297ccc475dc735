#![allow(clippy::unwrap_used)]
// Integration tests for `PortalClient` using wiremock.

use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lacrosse_api::{Credentials, Error, PortalClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PortalClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/v1.2/", server.uri())).unwrap();
    let client = PortalClient::new(base_url, &TransportConfig::default())
        .unwrap()
        .with_login_scheme("http");
    (server, client)
}

fn credentials() -> Credentials {
    Credentials {
        username: "user@example.com".into(),
        password: SecretString::from("hunter2".to_string()),
    }
}

fn bootstrap_script(server: &MockServer) -> String {
    format!(
        r#"var prodKey = "PK-TEST";
var serviceURL = window.location.protocol + "//{}/ws/";
function ok(response) {{ setCookie("sessionKey", response.sessionKey, 10); }}"#,
        server.address()
    )
}

const STATUS_PAGE: &str = "<script>\nuserProviderID = 42;userGatewaysList = '7001';var isMetric = 1;var devicesInitData = {\"1\":{\"device_id\":\"1\",\"device_name\":\"Porch\",\"obs\":[{\"ambient_temp\":21.5,\"humidity\":40,\"lowbattery\":0}]}};var refreshInt = 60;\n</script>";

async fn mount_bootstrap(server: &MockServer, script: String) {
    Mock::given(method("GET"))
        .and(path("/v1.2/resources/js/dd/account-enhanced.js"))
        .and(query_param("ver", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_string(script))
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/ws/user-api.php"))
        .and(query_param("pkey", "PK-TEST"))
        .and(query_param("action", "userlogin"))
        .and(body_string_contains("iLogEmail=user%40example.com"))
        .and(body_string_contains("iLogPass=hunter2"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn redirect_with(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(302)
        .insert_header("Location", "/v1.2/")
        .set_body_string(body)
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_installs_session_cookie() {
    let (server, client) = setup().await;
    mount_bootstrap(&server, bootstrap_script(&server)).await;
    mount_login(&server, redirect_with(r#"{"sessionKey":"abc123"}"#)).await;

    let discovery = client.authenticate(&credentials()).await.unwrap();

    assert_eq!(discovery.product_key, "PK-TEST");
    assert_eq!(discovery.cookie_name, "sessionKey");
    assert_eq!(client.cookie_header().as_deref(), Some("sessionKey=abc123"));
}

#[tokio::test]
async fn test_status_page_is_fetched_with_session_cookie() {
    let (server, client) = setup().await;
    mount_bootstrap(&server, bootstrap_script(&server)).await;
    mount_login(&server, redirect_with(r#"{"sessionKey":"abc123"}"#)).await;

    Mock::given(method("GET"))
        .and(path("/v1.2/"))
        .and(header("cookie", "sessionKey=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STATUS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    client.authenticate(&credentials()).await.unwrap();
    let status = client.fetch_status().await.unwrap();

    assert_eq!(status.provider_id, 42);
    assert!(status.is_metric);
    assert_eq!(status.devices.len(), 1);
    assert_eq!(status.devices[0].device_name.as_deref(), Some("Porch"));
}

#[tokio::test]
async fn test_bootstrap_without_product_key_installs_nothing() {
    let (server, client) = setup().await;
    let script = bootstrap_script(&server).replace("prodKey", "productKey");
    mount_bootstrap(&server, script).await;

    let result = client.authenticate(&credentials()).await;

    assert!(
        matches!(result, Err(Error::BootstrapParse { missing: "prodKey" })),
        "expected BootstrapParse error, got: {result:?}"
    );
    assert!(client.cookie_header().is_none());
}

#[tokio::test]
async fn test_login_without_redirect_fails() {
    let (server, client) = setup().await;
    mount_bootstrap(&server, bootstrap_script(&server)).await;
    mount_login(
        &server,
        ResponseTemplate::new(200).set_body_string(r#"{"sessionKey":"abc123"}"#),
    )
    .await;

    let result = client.authenticate(&credentials()).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(client.cookie_header().is_none());
}

#[tokio::test]
async fn test_redirect_without_session_key_fails() {
    let (server, client) = setup().await;
    mount_bootstrap(&server, bootstrap_script(&server)).await;
    mount_login(&server, redirect_with(r#"{"error":"invalid login"}"#)).await;

    let result = client.authenticate(&credentials()).await;

    match result {
        Err(Error::Authentication { ref message }) => {
            assert!(
                message.contains("session key"),
                "expected session key message, got: {message}"
            );
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

// ── Status page tests ───────────────────────────────────────────────

#[tokio::test]
async fn test_status_page_without_marker_is_stale_session() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1.2/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form id=\"login\"></form>"))
        .mount(&server)
        .await;

    let result = client.fetch_status_page().await;

    assert!(
        matches!(result, Err(Error::StaleSession)),
        "expected StaleSession, got: {result:?}"
    );
}

#[tokio::test]
async fn test_status_redirect_to_login_form_is_stale_session() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1.2/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/v1.2/login"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.2/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form id=\"login\"></form>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.fetch_status_page().await;

    assert!(
        matches!(result, Err(Error::StaleSession)),
        "expected StaleSession, got: {result:?}"
    );
}

#[tokio::test]
async fn test_status_redirect_is_followed() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1.2/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/v1.2/index.php"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.2/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STATUS_PAGE))
        .mount(&server)
        .await;

    let status = client.fetch_status().await.unwrap();

    assert_eq!(status.provider_id, 42);
}

#[tokio::test]
async fn test_redirect_loop_gives_up() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1.2/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/v1.2/"))
        .mount(&server)
        .await;

    let err = client.fetch_status_page().await.unwrap_err();

    assert!(
        matches!(err, Error::TooManyRedirects { .. }),
        "expected TooManyRedirects, got: {err:?}"
    );
    assert!(err.invalidates_session());
}

#[tokio::test]
async fn test_status_page_server_error_is_http_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1.2/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.fetch_status_page().await;

    let err = result.unwrap_err();
    assert!(
        matches!(err, Error::HttpStatus { status: 500, .. }),
        "expected HttpStatus error, got: {err:?}"
    );
    assert!(err.invalidates_session());
}
