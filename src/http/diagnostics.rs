//! Diagnostic HTTP server.
//!
//! # Responsibilities
//! - `/metrics`: Prometheus exposition of everything recorded through
//!   the `metrics` facade
//! - `/debug/status`: service name, version and uptime as JSON
//! - `/health`: liveness probe
//!
//! # Design Decisions
//! - Disabled unless `--profile-server-enable` or `diagnostics.enabled`
//! - Lives in the Global component so every command gets it

use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use clap::{Arg, ArgAction, ArgMatches, Command};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::errors::ComponentError;
use crate::http::server::ServerSlot;
use crate::lifecycle::{Component, Context};
use crate::observability::metrics::prometheus_handle;
use crate::service::CommandInitializer;

pub const ENABLE_FLAG: &str = "profile-server-enable";
pub const ADDR_FLAG: &str = "profile-server-addr";

#[derive(Clone)]
struct DiagnosticState {
    service: String,
    started: Instant,
    prometheus: Option<PrometheusHandle>,
}

#[derive(Serialize)]
pub struct DiagnosticStatus {
    pub service: String,
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Default)]
struct Overrides {
    enable: Option<bool>,
    addr: Option<String>,
}

/// HTTP server exposing metrics and status for operators.
#[derive(Default)]
pub struct DiagnosticServer {
    overrides: Mutex<Overrides>,
    slot: ServerSlot,
}

impl DiagnosticServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the server regardless of configuration, bound to `addr`.
    pub fn enabled_at(addr: impl Into<String>) -> Self {
        let server = Self::default();
        if let Ok(mut overrides) = server.overrides.lock() {
            overrides.enable = Some(true);
            overrides.addr = Some(addr.into());
        }
        server
    }

    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.slot.local_addr()
    }

    fn settings(&self, ctx: &Context) -> (bool, String) {
        let config = ctx
            .service()
            .map(|service| service.config().diagnostics.clone())
            .unwrap_or_default();
        match self.overrides.lock() {
            Ok(overrides) => (
                overrides.enable.unwrap_or(config.enabled),
                overrides.addr.clone().unwrap_or(config.address),
            ),
            Err(_) => (config.enabled, config.address),
        }
    }
}

fn router(state: DiagnosticState) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .route("/debug/status", get(get_status))
        .route("/health", get(|| async { "ok" }))
        .with_state(Arc::new(state))
}

async fn render_metrics(State(state): State<Arc<DiagnosticState>>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder unavailable".to_string(),
        ),
    }
}

async fn get_status(State(state): State<Arc<DiagnosticState>>) -> Json<DiagnosticStatus> {
    Json(DiagnosticStatus {
        service: state.service.clone(),
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

#[async_trait]
impl Component for DiagnosticServer {
    async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        let (enabled, address) = self.settings(&ctx);
        if !enabled {
            tracing::debug!(action = "profile_server", status = "disabled");
            return Ok(());
        }

        let state = DiagnosticState {
            service: ctx
                .service()
                .map(|service| service.name().to_string())
                .unwrap_or_default(),
            started: Instant::now(),
            prometheus: prometheus_handle(),
        };
        self.slot
            .serve("profile_server", &address, router(state), &ctx)
            .await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.slot.stop().await
    }

    async fn kill(&self) -> Result<(), ComponentError> {
        self.slot.kill()
    }

    fn command_initializer(&self) -> Option<&dyn CommandInitializer> {
        Some(self)
    }
}

impl CommandInitializer for DiagnosticServer {
    fn command_initialize(&self, cmd: Command) -> Command {
        cmd.arg(
            Arg::new(ENABLE_FLAG)
                .long(ENABLE_FLAG)
                .action(ArgAction::SetTrue)
                .global(true)
                .help("If enabled, start an HTTP profile server for diagnostics"),
        )
        .arg(
            Arg::new(ADDR_FLAG)
                .long(ADDR_FLAG)
                .value_name("ADDR")
                .global(true)
                .help("Address to bind the HTTP profile server to, if enabled"),
        )
    }

    fn command_configure(&self, matches: &ArgMatches) -> Result<(), ComponentError> {
        let mut overrides = self
            .overrides
            .lock()
            .map_err(|_| ComponentError::msg("diagnostic server state poisoned"))?;
        if let Ok(Some(true)) = matches.try_get_one::<bool>(ENABLE_FLAG) {
            overrides.enable = Some(true);
        }
        if let Ok(Some(addr)) = matches.try_get_one::<String>(ADDR_FLAG) {
            overrides.addr = Some(addr.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_by_default() {
        let server = DiagnosticServer::new();
        server.start(Context::background()).await.unwrap();
        assert!(server.local_addr().is_none());
        server.stop().await.unwrap();
    }

    #[test]
    fn test_flags_enable_server() {
        let server = DiagnosticServer::new();
        let matches = server
            .command_initialize(Command::new("svc"))
            .try_get_matches_from(["svc", "--profile-server-enable", "--profile-server-addr", "127.0.0.1:0"])
            .unwrap();
        server.command_configure(&matches).unwrap();

        let (enabled, address) = server.settings(&Context::background());
        assert!(enabled);
        assert_eq!(address, "127.0.0.1:0");
    }

    #[tokio::test]
    async fn test_serves_status() {
        let server = DiagnosticServer::enabled_at("127.0.0.1:0");
        server.start(Context::background()).await.unwrap();
        let addr = server.local_addr().expect("bound");

        let status: serde_json::Value = reqwest::get(format!("http://{addr}/debug/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["status"], "operational");

        let health = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");

        server.stop().await.unwrap();
    }
}
