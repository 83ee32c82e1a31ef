//! Error Reporting
//!
//! Server-side failures are forwarded to a process-wide [`ErrorReporter`].
//! The default reporter writes a structured `tracing` event; deployments can
//! install their own once at startup.

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::ApiError;

/// Sink for errors the client cannot act on.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: &ErrorReport);
}

/// What gets reported for one failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
    /// Stable grouping key: identical messages share a fingerprint.
    pub fingerprint: String,
}

impl ErrorReport {
    pub fn from_error(error: &ApiError) -> Self {
        let code = error.code.as_str();
        Self {
            code,
            message: error.message.clone(),
            fingerprint: fingerprint(code, &error.message),
        }
    }
}

fn fingerprint(code: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hasher.update(b":");
    hasher.update(message.as_bytes());
    hex::encode(&hasher.finalize()[..8])
}

/// Default reporter: one `tracing::error!` event per failure.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, report: &ErrorReport) {
        tracing::error!(
            target: "kith_api::reporting",
            code = report.code,
            fingerprint = %report.fingerprint,
            message = %report.message,
            "Error reported"
        );
    }
}

static REPORTER: OnceCell<Arc<dyn ErrorReporter>> = OnceCell::new();

/// Install the process-wide reporter. Returns `false` if one was already set.
pub fn install(reporter: Arc<dyn ErrorReporter>) -> bool {
    REPORTER.set(reporter).is_ok()
}

fn reporter() -> &'static Arc<dyn ErrorReporter> {
    REPORTER.get_or_init(|| Arc::new(TracingReporter))
}

/// Forward a failure to the installed reporter.
pub fn capture(error: &ApiError) {
    reporter().report(&ErrorReport::from_error(error));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_fields() {
        let report = ErrorReport::from_error(&ApiError::internal_error("pool closed"));
        assert_eq!(report.code, "INTERNAL");
        assert_eq!(report.message, "pool closed");
        assert_eq!(report.fingerprint.len(), 16);
    }

    #[test]
    fn test_fingerprint_groups_identical_messages() {
        let a = ErrorReport::from_error(&ApiError::internal_error("x"));
        let b = ErrorReport::from_error(&ApiError::internal_error("x"));
        let c = ErrorReport::from_error(&ApiError::internal_error("y"));
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn test_capture_without_install_uses_default() {
        capture(&ApiError::internal_error("unreported"));
    }
}
