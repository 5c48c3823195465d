//! OS signal handling.
//!
//! # Responsibilities
//! - Register interest in a configurable set of process signals
//! - Translate each delivered signal into a handler callback
//! - Provide the default shutdown policy: ask the bound service to exit
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every OS signal kind gets a forwarder task feeding one channel; the
//!   same channel accepts programmatic delivery
//! - The listener lives until the start context is cancelled; a later
//!   start takes over the channel once the previous listener has ended
//! - SIGKILL is part of the default set but cannot be trapped; it is
//!   skipped at registration

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, Mutex};

use crate::errors::ComponentError;
use crate::lifecycle::{Component, Context};

/// A process signal the watcher can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Hangup,
    Terminate,
    Kill,
    Interrupt,
}

/// Signals that trigger the default shutdown path.
pub const SHUTDOWN_SIGNALS: [Signal; 4] = [
    Signal::Hangup,
    Signal::Terminate,
    Signal::Kill,
    Signal::Interrupt,
];

impl Signal {
    pub fn name(self) -> &'static str {
        match self {
            Signal::Hangup => "SIGHUP",
            Signal::Terminate => "SIGTERM",
            Signal::Kill => "SIGKILL",
            Signal::Interrupt => "SIGINT",
        }
    }

    #[cfg(unix)]
    fn kind(self) -> Option<tokio::signal::unix::SignalKind> {
        use tokio::signal::unix::SignalKind;
        match self {
            Signal::Hangup => Some(SignalKind::hangup()),
            Signal::Terminate => Some(SignalKind::terminate()),
            Signal::Interrupt => Some(SignalKind::interrupt()),
            Signal::Kill => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Callback invoked once per delivered signal.
pub type SignalHandler = Arc<dyn Fn(Context, Signal) -> BoxFuture<'static, ()> + Send + Sync>;

/// Function used when no service is bound and the process must go down.
pub type HardExit = Arc<dyn Fn(i32) + Send + Sync>;

const DELIVERY_BUFFER: usize = 4;

/// A component bridging process signals to a handler callback.
///
/// Stop and kill are no-ops: by the time an orderly stop is requested the
/// signal has usually fired already. The listener ends when the context
/// passed to `start` is cancelled, so the watcher can be started again by
/// a later invocation.
pub struct SignalWatcher {
    signals: Vec<Signal>,
    handler: SignalHandler,
    tx: mpsc::Sender<Signal>,
    rx: Arc<Mutex<mpsc::Receiver<Signal>>>,
}

impl SignalWatcher {
    /// Watch `signals` and invoke `handler` for each one received.
    pub fn new<F, Fut>(signals: impl IntoIterator<Item = Signal>, handler: F) -> Self
    where
        F: Fn(Context, Signal) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        Self {
            signals: signals.into_iter().collect(),
            handler: Arc::new(move |ctx, sig| Box::pin(handler(ctx, sig))),
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// The default shutdown watcher.
    ///
    /// On any shutdown signal it asks the service bound in the context to
    /// exit with code 0, or terminates the process outright when no
    /// service is bound.
    pub fn shutdown() -> Self {
        Self::shutdown_with_exit(Arc::new(|code| std::process::exit(code)))
    }

    /// The shutdown watcher with a custom hard-exit function.
    pub fn shutdown_with_exit(hard_exit: HardExit) -> Self {
        Self::new(SHUTDOWN_SIGNALS, move |ctx: Context, sig: Signal| {
            let hard_exit = hard_exit.clone();
            async move {
                tracing::info!(
                    action = "shutdown_signal",
                    status = "signaled",
                    signal = %sig,
                    "Initiating shutdown"
                );
                let delivered = match ctx.service() {
                    Some(service) => service.exit(0).await,
                    None => false,
                };
                if !delivered {
                    tracing::warn!(
                        action = "shutdown_signal",
                        status = "no_service",
                        "No bound Service instance, performing hard exit"
                    );
                    hard_exit(0);
                }
            }
        })
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// A sender delivering signals to this watcher as if the OS had.
    pub fn sender(&self) -> mpsc::Sender<Signal> {
        self.tx.clone()
    }

    #[cfg(unix)]
    fn register(&self, ctx: &Context) -> Result<(), ComponentError> {
        use tokio::signal::unix::signal;

        for &sig in &self.signals {
            let Some(kind) = sig.kind() else {
                tracing::debug!(action = "signal", signal = %sig, "Signal cannot be trapped, skipping");
                continue;
            };
            let mut stream = signal(kind)?;
            let tx = self.tx.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        received = stream.recv() => {
                            if received.is_none() || tx.send(sig).await.is_err() {
                                break;
                            }
                        }
                        _ = ctx.cancelled() => break,
                    }
                }
            });
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn register(&self, ctx: &Context) -> Result<(), ComponentError> {
        if !self.signals.contains(&Signal::Interrupt) {
            return Ok(());
        }
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = tokio::signal::ctrl_c() => {
                        if received.is_err() || tx.send(Signal::Interrupt).await.is_err() {
                            break;
                        }
                    }
                    _ = ctx.cancelled() => break,
                }
            }
        });
        Ok(())
    }
}

#[async_trait]
impl Component for SignalWatcher {
    async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        self.register(&ctx)?;

        let rx = self.rx.clone();
        let handler = self.handler.clone();
        tokio::spawn(async move {
            // Held for the listener's lifetime; a restart waits here until
            // the previous listener has ended.
            let mut rx = tokio::select! {
                biased;
                _ = ctx.cancelled() => return,
                rx = rx.lock_owned() => rx,
            };
            loop {
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => break,
                    received = rx.recv() => {
                        let Some(sig) = received else { break };
                        tracing::debug!(action = "signal", signal = %sig, "Trapped signal");
                        handler(ctx.clone(), sig).await;
                    }
                }
            }
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn kill(&self) -> Result<(), ComponentError> {
        Ok(())
    }
}
