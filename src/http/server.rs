//! Lifecycle-managed HTTP server.
//!
//! # Responsibilities
//! - Bind the configured address on start
//! - Serve an Axum router on a background task
//! - Graceful shutdown on stop, abort on kill
//! - Contribute `--http-addr` to the command line

use std::net::SocketAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use clap::{Arg, ArgMatches, Command};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::errors::ComponentError;
use crate::lifecycle::{Component, Context};
use crate::net;
use crate::service::CommandInitializer;

/// Flag overriding the listen address of [`HttpService`].
pub const HTTP_ADDR_FLAG: &str = "http-addr";

#[derive(Default)]
struct SlotState {
    shutdown: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
    abort: Option<AbortHandle>,
    local_addr: Option<SocketAddr>,
}

/// The running server owned by a server component.
///
/// `stop` and `kill` may overlap: the abort handle is kept apart from the
/// join handle so a kill can cut short a stop that is still draining.
#[derive(Default)]
pub(crate) struct ServerSlot {
    state: Mutex<SlotState>,
}

impl ServerSlot {
    /// Bind `address` and serve `router` until stopped or `ctx` is cancelled.
    pub(crate) async fn serve(
        &self,
        component: &'static str,
        address: &str,
        router: Router,
        ctx: &Context,
    ) -> Result<SocketAddr, ComponentError> {
        if self.lock()?.task.is_some() {
            return Err(ComponentError::msg(format!("{component} already started")));
        }

        let listener = net::bind(address).await.map_err(ComponentError::new)?;
        let local_addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let graceful = {
            let shutdown = shutdown.clone();
            let ctx = ctx.clone();
            async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = ctx.cancelled() => {}
                }
            }
        };

        tracing::info!(action = component, status = "start", address = %local_addr);
        let task = tokio::spawn(async move {
            match axum::serve(listener, router).with_graceful_shutdown(graceful).await {
                Ok(()) => tracing::info!(action = component, status = "done"),
                Err(err) => tracing::error!(
                    action = component,
                    status = "error",
                    error = %err,
                    "Server exited with error"
                ),
            }
        });

        let mut state = self.lock()?;
        state.abort = Some(task.abort_handle());
        state.task = Some(task);
        state.shutdown = Some(shutdown);
        state.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Stop accepting, drain in-flight requests and wait for the task.
    pub(crate) async fn stop(&self) -> Result<(), ComponentError> {
        let (shutdown, task) = {
            let mut state = self.lock()?;
            (state.shutdown.take(), state.task.take())
        };
        if let Some(shutdown) = shutdown {
            shutdown.cancel();
        }
        if let Some(task) = task {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    return Err(ComponentError::new(err));
                }
            }
        }
        Ok(())
    }

    /// Abort the server task without draining.
    pub(crate) fn kill(&self) -> Result<(), ComponentError> {
        if let Some(abort) = self.lock()?.abort.take() {
            abort.abort();
        }
        Ok(())
    }

    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        self.state.lock().ok().and_then(|state| state.local_addr)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SlotState>, ComponentError> {
        self.state
            .lock()
            .map_err(|_| ComponentError::msg("server state poisoned"))
    }
}

/// An HTTP listener serving an application router.
///
/// The listen address comes from `--http-addr`, then [`HttpService::with_addr`],
/// then the `http.address` setting of the bound service.
pub struct HttpService {
    router: Router,
    addr: Mutex<Option<String>>,
    slot: ServerSlot,
}

impl HttpService {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            addr: Mutex::new(None),
            slot: ServerSlot::default(),
        }
    }

    pub fn with_addr(self, addr: impl Into<String>) -> Self {
        if let Ok(mut current) = self.addr.lock() {
            *current = Some(addr.into());
        }
        self
    }

    /// The bound address once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.slot.local_addr()
    }

    fn address(&self, ctx: &Context) -> String {
        let configured = self.addr.lock().ok().and_then(|addr| addr.clone());
        configured.unwrap_or_else(|| match ctx.service() {
            Some(service) => service.config().http.address.clone(),
            None => crate::config::HttpConfig::default().address,
        })
    }
}

#[async_trait]
impl Component for HttpService {
    async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        let address = self.address(&ctx);
        let router = self.router.clone().layer(TraceLayer::new_for_http());
        self.slot.serve("http_service", &address, router, &ctx).await?;
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

impl CommandInitializer for HttpService {
    fn command_initialize(&self, cmd: Command) -> Command {
        cmd.arg(
            Arg::new(HTTP_ADDR_FLAG)
                .long(HTTP_ADDR_FLAG)
                .value_name("ADDR")
                .help("Network address and port to listen for HTTP requests on"),
        )
    }

    fn command_configure(&self, matches: &ArgMatches) -> Result<(), ComponentError> {
        if let Ok(Some(addr)) = matches.try_get_one::<String>(HTTP_ADDR_FLAG) {
            let mut current = self
                .addr
                .lock()
                .map_err(|_| ComponentError::msg("http service state poisoned"))?;
            *current = Some(addr.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_flag_overrides_addr() {
        let service = HttpService::new(Router::new()).with_addr("127.0.0.1:1");
        let matches = service
            .command_initialize(Command::new("serve"))
            .try_get_matches_from(["serve", "--http-addr", "127.0.0.1:2"])
            .unwrap();
        service.command_configure(&matches).unwrap();
        assert_eq!(service.address(&Context::background()), "127.0.0.1:2");
    }

    #[test]
    fn test_default_addr_without_service() {
        let service = HttpService::new(Router::new());
        assert_eq!(service.address(&Context::background()), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let service = HttpService::new(Router::new().route("/", get(|| async { "ok" })))
            .with_addr("127.0.0.1:0");
        let ctx = Context::background();
        service.start(ctx.clone()).await.unwrap();
        assert!(service.local_addr().is_some());
        assert!(service.start(ctx).await.is_err());
        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_kill_cuts_short_draining_stop() {
        let (entered_tx, mut entered_rx) = tokio::sync::mpsc::unbounded_channel();
        let slow = Router::new().route(
            "/slow",
            get(move || {
                let entered_tx = entered_tx.clone();
                async move {
                    let _ = entered_tx.send(());
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    "late"
                }
            }),
        );
        let service = Arc::new(HttpService::new(slow).with_addr("127.0.0.1:0"));
        service.start(Context::background()).await.unwrap();
        let addr = service.local_addr().expect("bound");

        let request = tokio::spawn(reqwest::get(format!("http://{addr}/slow")));
        tokio::time::timeout(Duration::from_secs(5), entered_rx.recv())
            .await
            .expect("request should reach the handler");

        let stopping = service.clone();
        let stop = tokio::spawn(async move { stopping.stop().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!stop.is_finished(), "stop should wait for the in-flight request");

        service.kill().await.unwrap();
        let stopped = tokio::time::timeout(Duration::from_secs(2), stop)
            .await
            .expect("kill should end the draining stop");
        assert!(stopped.unwrap().is_ok());
        request.abort();
    }

    #[tokio::test]
    async fn test_stop_without_start_is_ok() {
        let service = HttpService::new(Router::new());
        service.stop().await.unwrap();
        service.kill().await.unwrap();
    }
}
