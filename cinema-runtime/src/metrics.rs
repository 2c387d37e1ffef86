//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the reservation pipeline:
//! - Fast index operations (claim/release)
//! - Durable store operations (persist/cancel)
//! - Reservation coordinator outcomes
//! - Circuit breaker state
//! - Retry attempts
//!
//! # Example
//!
//! ```rust,no_run
//! use cinema_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Start metrics server on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
    /// Failed to bind HTTP server
    #[error("Failed to bind metrics server: {0}")]
    Bind(#[from] std::io::Error),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Initialize metrics and start the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns error if metrics exporter cannot be installed or server cannot bind.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this will fail
    /// with `MetricsError::Install`. In production, ensure this is only called once.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Fast index metrics
    describe_counter!(
        "fast_index_claims_total",
        "Total number of AtomicClaim attempts against the fast index"
    );
    describe_counter!(
        "fast_index_claim_conflicts_total",
        "Total number of AtomicClaim attempts rejected due to seat conflict"
    );
    describe_counter!(
        "fast_index_claim_distance_violations_total",
        "Total number of AtomicClaim attempts rejected due to minimum-distance violation"
    );
    describe_counter!(
        "fast_index_releases_total",
        "Total number of AtomicRelease operations"
    );
    describe_histogram!(
        "fast_index_claim_duration_seconds",
        "Time taken to execute an AtomicClaim"
    );

    // Durable store metrics
    describe_counter!(
        "durable_store_reservations_created_total",
        "Total number of reservations persisted"
    );
    describe_counter!(
        "durable_store_reservations_canceled_total",
        "Total number of reservations canceled"
    );
    describe_histogram!(
        "durable_store_persist_duration_seconds",
        "Time taken to persist a reservation transaction"
    );

    // Coordinator metrics
    describe_counter!(
        "reservation_attempts_total",
        "Total number of ReserveSeats requests handled"
    );
    describe_counter!(
        "reservation_compensations_total",
        "Total number of fast-index rollbacks triggered by a failed durable persist"
    );
    describe_counter!(
        "reservation_compensation_failures_total",
        "Total number of compensations that themselves failed (CRITICAL, manual reconciliation required)"
    );

    // Circuit breaker metrics
    describe_gauge!(
        "circuit_breaker_state",
        "Current circuit breaker state (0=closed, 1=half-open, 2=open)"
    );
    describe_counter!("circuit_breaker_calls_total", "Total number of calls through circuit breaker");
    describe_counter!("circuit_breaker_successes_total", "Total number of successful calls");
    describe_counter!("circuit_breaker_failures_total", "Total number of failed calls");
    describe_counter!(
        "circuit_breaker_rejections_total",
        "Total number of rejected calls (circuit open)"
    );

    // Retry metrics
    describe_counter!("retry_attempts_total", "Total number of retry attempts");
    describe_counter!("retry_successes_total", "Total number of successful retries");
    describe_counter!(
        "retry_exhausted_total",
        "Total number of retry attempts that exhausted max retries"
    );
}

/// Fast index (Redis) metrics recorder.
pub struct FastIndexMetrics;

impl FastIndexMetrics {
    /// Record a successful `AtomicClaim`.
    pub fn record_claim(duration: Duration) {
        counter!("fast_index_claims_total").increment(1);
        histogram!("fast_index_claim_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an `AtomicClaim` rejected by seat conflict.
    pub fn record_conflict() {
        counter!("fast_index_claim_conflicts_total").increment(1);
    }

    /// Record an `AtomicClaim` rejected by distance violation.
    pub fn record_distance_violation() {
        counter!("fast_index_claim_distance_violations_total").increment(1);
    }

    /// Record an `AtomicRelease`.
    pub fn record_release() {
        counter!("fast_index_releases_total").increment(1);
    }
}

/// Durable store (Postgres) metrics recorder.
pub struct DurableStoreMetrics;

impl DurableStoreMetrics {
    /// Record a successful reservation persist.
    pub fn record_create(duration: Duration) {
        counter!("durable_store_reservations_created_total").increment(1);
        histogram!("durable_store_persist_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a successful cancel.
    pub fn record_cancel() {
        counter!("durable_store_reservations_canceled_total").increment(1);
    }
}

/// Reservation coordinator metrics recorder.
pub struct CoordinatorMetrics;

impl CoordinatorMetrics {
    /// Record a reservation attempt.
    pub fn record_attempt() {
        counter!("reservation_attempts_total").increment(1);
    }

    /// Record a compensation (fast-index rollback after durable failure).
    pub fn record_compensation() {
        counter!("reservation_compensations_total").increment(1);
    }

    /// Record a compensation that itself failed. CRITICAL: manual reconciliation required.
    pub fn record_compensation_failure() {
        counter!("reservation_compensation_failures_total").increment(1);
    }
}

/// Circuit breaker metrics recorder.
pub struct CircuitBreakerMetrics;

impl CircuitBreakerMetrics {
    /// Record circuit breaker state.
    ///
    /// 0 = Closed, 1 = `HalfOpen`, 2 = Open
    pub fn record_state(state: f64) {
        gauge!("circuit_breaker_state").set(state);
    }

    /// Record a call attempt.
    pub fn record_call() {
        counter!("circuit_breaker_calls_total").increment(1);
    }

    /// Record a successful call.
    pub fn record_success() {
        counter!("circuit_breaker_successes_total").increment(1);
    }

    /// Record a failed call.
    pub fn record_failure() {
        counter!("circuit_breaker_failures_total").increment(1);
    }

    /// Record a rejected call (circuit open).
    pub fn record_rejection() {
        counter!("circuit_breaker_rejections_total").increment(1);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}
