//! Router tests that never reach the database.
//!
//! Authentication, path ids, query strings and bodies are all checked before
//! a handler asks the pool for a connection, so these run without Postgres.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;

#[path = "support/app.rs"]
mod test_app_support;

use test_app_support::{bearer, test_app};

async fn send(request: Request<Body>) -> Response {
    test_app(&[]).oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed(method: Method, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer())
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[tokio::test]
async fn test_api_requires_bearer_token() {
    for uri in ["/api/me", "/api/friends", "/api/circles", "/api/address-lookup?q=a"] {
        let response = send(Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let response = send(
        Request::get("/api/friends")
            .header(header::AUTHORIZATION, "Bearer not.a.jwt")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// PATH IDS
// ============================================================================

#[tokio::test]
async fn test_non_uuid_path_id_is_invalid_id() {
    for uri in [
        "/api/friends/42",
        "/api/contacts/abc",
        "/api/collectives/not-a-uuid",
        "/api/friends/nope/encounters",
    ] {
        let response = send(authed(Method::GET, uri).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_ID", "{uri}");
    }
}

#[tokio::test]
async fn test_second_path_id_is_checked() {
    let uri = format!("/api/circles/{}/members/12", uuid::Uuid::now_v7());
    let response = send(authed(Method::PUT, &uri).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_ID");
}

// ============================================================================
// LIST QUERIES
// ============================================================================

#[tokio::test]
async fn test_list_query_reports_every_bad_key() {
    let response = send(
        authed(Method::GET, "/api/friends?page=0&sort=shoeSize&favorite=maybe&pageSize=999")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
    let fields: Vec<&str> = body["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert!(fields.contains(&"page"));
    assert!(fields.contains(&"sort"));
    assert!(fields.contains(&"favorite"));
    assert!(!fields.contains(&"pageSize"));
}

#[tokio::test]
async fn test_encounter_date_range_is_validated() {
    let response = send(
        authed(Method::GET, "/api/encounters?from=2024-02-01&to=2024-01-01")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_address_lookup_requires_q() {
    let response = send(
        authed(Method::GET, "/api/address-lookup?country=France&limit=500")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["fields"].as_array().unwrap().len(), 3);
}

// ============================================================================
// BODIES
// ============================================================================

#[tokio::test]
async fn test_malformed_json_is_invalid_body() {
    let response = send(
        authed(Method::POST, "/api/circles")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_unknown_contact_field_is_invalid_body() {
    let body = kith_test_utils::fixtures::body_with_unknown_field();
    let response = send(
        authed(Method::POST, "/api/contacts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_unknown_field_is_invalid_body() {
    let response = send(
        authed(Method::POST, "/api/circles")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Climbing","shade":"red"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_validation_failure_lists_fields() {
    let response = send(
        authed(Method::POST, "/api/circles")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"  ","color":"orange"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["fields"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_patch_is_rejected() {
    let uri = format!("/api/friends/{}", uuid::Uuid::now_v7());
    let response = send(
        authed(Method::PATCH, &uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "VALIDATION_FAILED");
}

// ============================================================================
// PUBLIC ENDPOINTS
// ============================================================================

#[tokio::test]
async fn test_health_probes_need_no_auth() {
    let response = send(Request::get("/health/ping").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"pong");

    let response = send(Request::get("/health/live").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_expose_http_counters() {
    let app = test_app(&[]);
    app.clone()
        .oneshot(Request::get("/health/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("kith_http_requests_total"));
    assert!(text.contains("kith_http_request_duration_seconds"));
}

// ============================================================================
// CORS
// ============================================================================

async fn preflight(origin: &str) -> Response {
    test_app(&["https://app.example.com"])
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/friends")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let response = preflight("https://app.example.com").await;
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://app.example.com"
    );
}

#[tokio::test]
async fn test_cors_ignores_other_origins() {
    let response = preflight("https://evil.example.org").await;
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
