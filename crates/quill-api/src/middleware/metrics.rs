//! Metrics tracking middleware
//!
//! Counts requests and records latency per method, endpoint and status in a
//! Prometheus registry owned by the application state.

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

/// Latency buckets in seconds
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5];

/// HTTP metrics backed by a private registry
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
    build_info: IntGauge,
}

impl HttpMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("quill".to_string()), None)?;

        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests by method, endpoint and status"),
            &["method", "endpoint", "status"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "endpoint"],
        )?;
        let build_info = IntGauge::with_opts(
            Opts::new("build_info", "Build information")
                .const_label("version", env!("CARGO_PKG_VERSION")),
        )?;
        build_info.set(1);

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(build_info.clone()))?;
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            requests,
            latency,
            build_info,
        })
    }

    /// Record one completed request
    pub fn observe(&self, method: &str, endpoint: &str, status: u16, seconds: f64) {
        self.requests
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.latency
            .with_label_values(&[method, endpoint])
            .observe(seconds);
    }

    /// Number of requests recorded for a label set
    pub fn request_count(&self, method: &str, endpoint: &str, status: u16) -> u64 {
        self.requests
            .with_label_values(&[method, endpoint, &status.to_string()])
            .get()
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetrics")
            .field("build_info", &self.build_info.get())
            .finish_non_exhaustive()
    }
}

/// Metrics tracking middleware
///
/// Uses the matched route template as the endpoint label when routing
/// succeeded, otherwise a normalized path.
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| normalize_endpoint(request.uri().path()));

    let response = next.run(request).await;

    state.metrics.observe(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Replace id-like path segments with `:id`
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if uuid::Uuid::parse_str(seg).is_ok() || is_numeric(seg) {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/users/123"), "/users/:id");
        assert_eq!(
            normalize_endpoint("/posts/550e8400-e29b-41d4-a716-446655440000"),
            "/posts/:id"
        );
        assert_eq!(normalize_endpoint("/posts"), "/posts");
        assert_eq!(normalize_endpoint("/health"), "/health");
    }

    #[test]
    fn test_is_numeric() {
        assert!(is_numeric("999"));
        assert!(!is_numeric("12a"));
        assert!(!is_numeric(""));
    }

    #[test]
    fn test_observe_and_render() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe("GET", "/posts", 200, 0.002);
        metrics.observe("GET", "/posts", 200, 0.020);
        metrics.observe("GET", "/posts", 401, 0.001);

        assert_eq!(metrics.request_count("GET", "/posts", 200), 2);
        assert_eq!(metrics.request_count("GET", "/posts", 401), 1);

        let text = metrics.render().unwrap();
        assert!(text.contains("quill_http_requests_total"));
        assert!(text.contains("quill_http_request_duration_seconds_bucket"));
        assert!(text.contains("quill_build_info"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = HttpMetrics::new().unwrap();
        let b = HttpMetrics::new().unwrap();
        a.observe("POST", "/login", 202, 0.1);

        assert_eq!(a.request_count("POST", "/login", 202), 1);
        assert_eq!(b.request_count("POST", "/login", 202), 0);
    }
}
