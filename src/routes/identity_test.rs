use super::*;
use axum::http::Request;

fn parts(builder: axum::http::request::Builder) -> Parts {
    builder.body(()).expect("request should build").into_parts().0
}

#[test]
fn forwarded_header_wins() {
    let mut req = parts(Request::get("/").header("CF-Connecting-IP", "203.0.113.9"));
    req.extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5000))));
    assert_eq!(resolve_key(&req, "CF-Connecting-IP"), "203.0.113.9");
}

#[test]
fn header_lookup_is_case_insensitive() {
    let req = parts(Request::get("/").header("cf-connecting-ip", "203.0.113.9"));
    assert_eq!(resolve_key(&req, "CF-Connecting-IP"), "203.0.113.9");
}

#[test]
fn blank_header_falls_back_to_peer_address() {
    let mut req = parts(Request::get("/").header("CF-Connecting-IP", "  "));
    req.extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5000))));
    assert_eq!(resolve_key(&req, "CF-Connecting-IP"), "10.0.0.1:5000");
}

#[test]
fn custom_header_name_is_honored() {
    let req = parts(
        Request::get("/")
            .header("X-Real-IP", "198.51.100.4")
            .header("CF-Connecting-IP", "203.0.113.9"),
    );
    assert_eq!(resolve_key(&req, "X-Real-IP"), "198.51.100.4");
}

#[test]
fn missing_everything_is_unknown() {
    let req = parts(Request::get("/"));
    assert_eq!(resolve_key(&req, "CF-Connecting-IP"), UNKNOWN_CLIENT);
}

#[tokio::test]
async fn extractor_uses_state_config() {
    let state = crate::state::test_helpers::test_app_state_with(|config| {
        config.forwarded_ip_header = "X-Client".into();
    });
    let mut req = parts(Request::get("/").header("X-Client", "1.1.1.1"));
    let ClientKey(key) = ClientKey::from_request_parts(&mut req, &state)
        .await
        .expect("extraction is infallible");
    assert_eq!(key, "1.1.1.1");
}
