//! Prometheus metrics for cluster auditing
//!
//! Exposes metrics via HTTP endpoint for Prometheus scraping.

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics registry
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Audit metrics collection
pub struct Metrics {
    /// Registry for all metrics
    pub registry: Registry,

    // Primary tracking metrics
    /// Refresh cycles by outcome
    pub refresh_cycles_total: IntCounterVec,
    /// Single-member primary probes by result
    pub primary_probes_total: IntCounterVec,
    /// Primary reference swaps
    pub primary_switches_total: IntCounter,
    /// Members of the tracked cluster
    pub cluster_members: IntGauge,

    // Check metrics
    /// Cluster checks by diagnostic and result
    pub cluster_checks_total: IntCounterVec,
    /// Cluster check latency histogram (in seconds)
    pub cluster_check_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new metrics collection
    pub fn new() -> Self {
        let registry = Registry::new();

        // Primary tracking metrics
        let refresh_cycles_total = IntCounterVec::new(
            Opts::new(
                "pg_audit_refresh_cycles_total",
                "Total number of primary refresh cycles by outcome",
            ),
            &["outcome"], // unchanged, switched, no_primary, multiple_primaries
        )
        .unwrap();

        let primary_probes_total = IntCounterVec::new(
            Opts::new(
                "pg_audit_primary_probes_total",
                "Total number of primary probes by result",
            ),
            &["result"], // primary, replica, failure, timeout
        )
        .unwrap();

        let primary_switches_total = IntCounter::new(
            "pg_audit_primary_switches_total",
            "Total number of detected primary switches",
        )
        .unwrap();

        let cluster_members = IntGauge::new(
            "pg_audit_cluster_members",
            "Number of members in the tracked cluster",
        )
        .unwrap();

        // Check metrics
        let cluster_checks_total = IntCounterVec::new(
            Opts::new(
                "pg_audit_cluster_checks_total",
                "Total number of cluster checks by diagnostic and result",
            ),
            &["diagnostic", "result"],
        )
        .unwrap();

        let cluster_check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pg_audit_cluster_check_duration_seconds",
                "Cluster check latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["diagnostic"],
        )
        .unwrap();

        // Register all metrics
        registry
            .register(Box::new(refresh_cycles_total.clone()))
            .unwrap();
        registry
            .register(Box::new(primary_probes_total.clone()))
            .unwrap();
        registry
            .register(Box::new(primary_switches_total.clone()))
            .unwrap();
        registry
            .register(Box::new(cluster_members.clone()))
            .unwrap();
        registry
            .register(Box::new(cluster_checks_total.clone()))
            .unwrap();
        registry
            .register(Box::new(cluster_check_duration_seconds.clone()))
            .unwrap();

        Self {
            registry,
            refresh_cycles_total,
            primary_probes_total,
            primary_switches_total,
            cluster_members,
            cluster_checks_total,
            cluster_check_duration_seconds,
        }
    }

    /// Record a finished refresh cycle
    pub fn record_refresh(&self, outcome: &str) {
        self.refresh_cycles_total.with_label_values(&[outcome]).inc();
    }

    /// Record a single probe result
    pub fn record_probe(&self, result: &str) {
        self.primary_probes_total.with_label_values(&[result]).inc();
    }

    pub fn record_primary_switch(&self) {
        self.primary_switches_total.inc();
    }

    pub fn set_cluster_members(&self, count: usize) {
        self.cluster_members.set(count as i64);
    }

    /// Record a cluster check execution
    pub fn record_check(&self, diagnostic: &str, result: &str, duration: Duration) {
        self.cluster_checks_total
            .with_label_values(&[diagnostic, result])
            .inc();
        self.cluster_check_duration_seconds
            .with_label_values(&[diagnostic])
            .observe(duration.as_secs_f64());
    }

    /// Get metrics as Prometheus text format
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(addr: &str) -> anyhow::Result<()> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tracing::{error, info};

    async fn handle_request(
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let response = match req.uri().path() {
            "/metrics" => {
                let mut response = Response::new(Full::new(Bytes::from(metrics().gather())));
                response.headers_mut().insert(
                    hyper::header::CONTENT_TYPE,
                    hyper::header::HeaderValue::from_static(
                        "text/plain; version=0.0.4; charset=utf-8",
                    ),
                );
                response
            }
            "/health" => Response::new(Full::new(Bytes::from("OK"))),
            _ => {
                let mut response = Response::new(Full::new(Bytes::from("Not Found")));
                *response.status_mut() = StatusCode::NOT_FOUND;
                response
            }
        };
        Ok(response)
    }

    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Metrics server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                error!(error = %e, "Metrics server connection error");
            }
        });
    }
}
