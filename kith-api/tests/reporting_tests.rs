//! Installed error reporters.
//!
//! The reporter is process-wide, so these tests live in their own binary and
//! install a capturing reporter before anything else can reach the default.

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use kith_api::reporting::{install, ErrorReport, ErrorReporter};
use kith_api::ApiError;
use once_cell::sync::Lazy;
use serde_json::Value;
use tower::ServiceExt;

#[derive(Default)]
struct CapturingReporter {
    reports: Mutex<Vec<ErrorReport>>,
}

impl ErrorReporter for CapturingReporter {
    fn report(&self, report: &ErrorReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

impl CapturingReporter {
    fn messages(&self) -> Vec<String> {
        self.reports.lock().unwrap().iter().map(|r| r.message.clone()).collect()
    }
}

static SINK: Lazy<Arc<CapturingReporter>> = Lazy::new(|| {
    let sink = Arc::new(CapturingReporter::default());
    assert!(install(sink.clone()), "a reporter was installed before the test sink");
    sink
});

fn app() -> Router {
    Router::new()
        .route(
            "/broken",
            get(|| async { Err::<(), _>(ApiError::internal_error("ledger table is missing")) }),
        )
        .route(
            "/missing",
            get(|| async { Err::<(), _>(ApiError::not_found("Friend")) }),
        )
}

async fn get_path(path: &str) -> (StatusCode, Value) {
    let response = app()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_server_error_reaches_installed_reporter() {
    let sink = SINK.clone();

    let (status, body) = get_path("/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL");
    assert_ne!(body["error"], "ledger table is missing");

    let reports = sink.reports.lock().unwrap();
    let report = reports
        .iter()
        .find(|r| r.message == "ledger table is missing")
        .expect("500 was not reported");
    assert_eq!(report.code, "INTERNAL");
    assert_eq!(report.fingerprint.len(), 16);
}

#[tokio::test]
async fn test_client_errors_are_not_reported() {
    let sink = SINK.clone();

    let (status, body) = get_path("/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Friend not found");
    assert!(!sink.messages().iter().any(|m| m.contains("Friend")));
}

#[test]
fn test_second_install_is_refused() {
    Lazy::force(&SINK);
    assert!(!install(Arc::new(CapturingReporter::default())));
}
