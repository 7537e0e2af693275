use super::*;
use std::collections::HashMap;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_vars_requires_token() {
    let err = ClientConfig::from_vars(vars(&[])).expect_err("token is required");
    assert!(matches!(err, Error::MissingApiToken { var: ENV_API_TOKEN }));
}

#[test]
fn from_vars_rejects_empty_token() {
    let err = ClientConfig::from_vars(vars(&[(ENV_API_TOKEN, "")])).expect_err("empty token");
    assert!(matches!(err, Error::MissingApiToken { .. }));
}

#[test]
fn from_vars_applies_defaults() {
    let cfg = ClientConfig::from_vars(vars(&[(ENV_API_TOKEN, "secret")])).unwrap();
    assert_eq!(cfg.api_token, "secret");
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert!(cfg.user_agent.starts_with("exaroton-rs@"));
    assert_eq!(cfg.timeouts, Timeouts::default());
    assert_eq!(cfg.websocket, WebsocketOptions::default());
    assert_eq!(cfg.websocket.reconnect_interval, Duration::from_millis(3000));
    assert_eq!(cfg.websocket.stream_retry_interval, Duration::from_secs(15));
    assert!(cfg.websocket.auto_reconnect);
}

#[test]
fn from_vars_parses_overrides() {
    let cfg = ClientConfig::from_vars(vars(&[
        (ENV_API_TOKEN, "secret"),
        (ENV_BASE_URL, "http://localhost:8080/api"),
        (ENV_USER_AGENT, "tests/1.0"),
        (ENV_REQUEST_TIMEOUT_SECS, "5"),
        (ENV_CONNECT_TIMEOUT_SECS, "2"),
        (ENV_AUTO_RECONNECT, "false"),
        (ENV_RECONNECT_MS, "250"),
        (ENV_STREAM_RETRY_SECS, "1"),
    ]))
    .unwrap();

    assert_eq!(cfg.base_url, "http://localhost:8080/api/");
    assert_eq!(cfg.user_agent, "tests/1.0");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 5, connect_secs: 2 });
    assert!(!cfg.websocket.auto_reconnect);
    assert_eq!(cfg.websocket.reconnect_interval, Duration::from_millis(250));
    assert_eq!(cfg.websocket.stream_retry_interval, Duration::from_secs(1));
}

#[test]
fn from_vars_falls_back_on_unparseable_numbers() {
    let cfg = ClientConfig::from_vars(vars(&[(ENV_API_TOKEN, "secret"), (ENV_RECONNECT_MS, "soon")])).unwrap();
    assert_eq!(cfg.websocket.reconnect_interval, Duration::from_millis(DEFAULT_RECONNECT_MS));
}

#[test]
fn from_vars_ignores_zero_stream_retry() {
    let cfg = ClientConfig::from_vars(vars(&[(ENV_API_TOKEN, "secret"), (ENV_STREAM_RETRY_SECS, "0")])).unwrap();
    assert_eq!(cfg.websocket.stream_retry_interval, Duration::from_secs(DEFAULT_STREAM_RETRY_SECS));
}

#[test]
fn from_vars_rejects_non_http_base_url() {
    let err = ClientConfig::from_vars(vars(&[(ENV_API_TOKEN, "secret"), (ENV_BASE_URL, "ftp://example.test/")]))
        .expect_err("scheme must be http(s)");
    assert!(matches!(err, Error::InvalidBaseUrl(_)));
}

#[test]
fn with_base_url_rejects_missing_host() {
    let err = ClientConfig::new("t").with_base_url("https:///v1/").expect_err("host required");
    assert!(matches!(err, Error::InvalidBaseUrl(_)));
}

#[test]
fn websocket_url_uses_wss_for_https() {
    let cfg = ClientConfig::new("t");
    assert_eq!(
        cfg.websocket_url("abc123").unwrap(),
        "wss://api.exaroton.com/v1/servers/abc123/websocket"
    );
}

#[test]
fn websocket_url_uses_ws_for_http() {
    let cfg = ClientConfig::new("t").with_base_url("http://127.0.0.1:9000/").unwrap();
    assert_eq!(cfg.websocket_url("s1").unwrap(), "ws://127.0.0.1:9000/servers/s1/websocket");
}
