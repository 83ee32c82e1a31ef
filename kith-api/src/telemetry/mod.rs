//! Kith Telemetry - Logging and Metrics
//!
//! Structured logging through `tracing-subscriber` and Prometheus metrics for
//! the HTTP layer. Nothing here talks to an external collector.

pub mod logging;
pub mod metrics;
pub mod middleware;

pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{metrics_handler, KithMetrics, METRICS};
pub use middleware::observability_middleware;
