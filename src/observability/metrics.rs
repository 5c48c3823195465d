//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder behind the `metrics` facade
//! - Periodically capture process and runtime gauges
//!
//! # Metrics
//! - `process_uptime_seconds` (gauge): time since capture started
//! - `tokio_workers` (gauge): runtime worker threads
//! - `tokio_alive_tasks` (gauge): tasks currently alive
//! - `tokio_global_queue_depth` (gauge): tasks waiting in the injection queue
//! - `runtime_metrics_captures_total` (counter): completed captures
//!
//! # Design Decisions
//! - The recorder is process-wide and installed at most once
//! - Capture runs on its own task and ends on stop or context cancellation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::errors::ComponentError;
use crate::lifecycle::{Component, Context};

static PROMETHEUS: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// The process-wide Prometheus handle, installing the recorder on first use.
///
/// Returns `None` if another recorder was installed first.
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to install Prometheus recorder");
                None
            }
        })
        .clone()
}

#[derive(Default)]
struct Capture {
    shutdown: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

/// Periodic capture of process and runtime statistics.
///
/// The interval comes from [`RuntimeMetricsComponent::with_interval`] or the
/// `runtime_metrics` settings of the bound service.
#[derive(Default)]
pub struct RuntimeMetricsComponent {
    interval: Option<Duration>,
    captures: Arc<AtomicU64>,
    capture: Mutex<Capture>,
}

impl RuntimeMetricsComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Number of captures taken so far.
    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Capture>, ComponentError> {
        self.capture
            .lock()
            .map_err(|_| ComponentError::msg("runtime metrics state poisoned"))
    }
}

fn capture_once(started: Instant) {
    metrics::gauge!("process_uptime_seconds").set(started.elapsed().as_secs_f64());

    let runtime = tokio::runtime::Handle::current().metrics();
    metrics::gauge!("tokio_workers").set(runtime.num_workers() as f64);
    metrics::gauge!("tokio_alive_tasks").set(runtime.num_alive_tasks() as f64);
    metrics::gauge!("tokio_global_queue_depth").set(runtime.global_queue_depth() as f64);

    metrics::counter!("runtime_metrics_captures_total").increment(1);
}

#[async_trait]
impl Component for RuntimeMetricsComponent {
    async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        let settings = ctx
            .service()
            .map(|service| service.config().runtime_metrics.clone())
            .unwrap_or_default();
        if !settings.enabled && self.interval.is_none() {
            tracing::debug!(action = "runtime_metrics", status = "disabled");
            return Ok(());
        }
        let interval = self
            .interval
            .unwrap_or_else(|| Duration::from_secs(settings.interval_secs));

        let mut capture = self.lock()?;
        if capture.task.is_some() {
            return Err(ComponentError::msg("runtime metrics already started"));
        }

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let captures = self.captures.clone();
        let started = Instant::now();

        tracing::debug!(
            action = "runtime_metrics",
            status = "start",
            interval_ms = interval.as_millis() as u64
        );
        capture.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        capture_once(started);
                        captures.fetch_add(1, Ordering::Relaxed);
                    }
                    _ = token.cancelled() => break,
                    _ = ctx.cancelled() => break,
                }
            }
        }));
        capture.shutdown = Some(shutdown);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        let (shutdown, task) = {
            let mut capture = self.lock()?;
            (capture.shutdown.take(), capture.task.take())
        };
        if let Some(shutdown) = shutdown {
            shutdown.cancel();
        }
        if let Some(task) = task {
            let _ = task.await;
        }
        Ok(())
    }

    async fn kill(&self) -> Result<(), ComponentError> {
        if let Some(task) = self.lock()?.task.take() {
            task.abort();
        }
        Ok(())
    }
}
