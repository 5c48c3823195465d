//! The lifecycle contract and a closure-backed leaf implementation.

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::errors::ComponentError;
use crate::lifecycle::Context;
use crate::service::CommandInitializer;

/// A unit that can be started, stopped in an orderly way, or killed.
///
/// Methods take `&self`: the supervising loop may call `kill` while a
/// `stop` is still in flight, so implementations keep their mutable state
/// behind locks or atomics and must tolerate that overlap.
#[async_trait]
pub trait Component: Send + Sync {
    /// Bring the component up. May block for the lifetime of the
    /// component when it is used as a command handler.
    async fn start(&self, ctx: Context) -> Result<(), ComponentError>;

    /// Orderly shutdown.
    async fn stop(&self) -> Result<(), ComponentError>;

    /// Forced teardown, used when `stop` exceeds its budget.
    async fn kill(&self) -> Result<(), ComponentError>;

    /// Optional capability: contribute flags to the command line.
    fn command_initializer(&self) -> Option<&dyn CommandInitializer> {
        None
    }

    /// Optional capability: look up a named child.
    fn find_component(&self, _name: &str) -> Option<&dyn Component> {
        None
    }
}

type StartFn = Box<dyn Fn(Context) -> BoxFuture<'static, Result<(), ComponentError>> + Send + Sync>;
type TeardownFn = Box<dyn Fn() -> BoxFuture<'static, Result<(), ComponentError>> + Send + Sync>;

/// A component assembled inline from closures.
///
/// Any hook left unset is a no-op that succeeds.
#[derive(Default)]
pub struct SimpleComponent {
    on_start: Option<StartFn>,
    on_stop: Option<TeardownFn>,
    on_kill: Option<TeardownFn>,
    initializer: Option<Box<dyn CommandInitializer>>,
}

impl SimpleComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), ComponentError>> + Send + 'static,
    {
        self.on_start = Some(Box::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), ComponentError>> + Send + 'static,
    {
        self.on_stop = Some(Box::new(move || Box::pin(f())));
        self
    }

    pub fn on_kill<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), ComponentError>> + Send + 'static,
    {
        self.on_kill = Some(Box::new(move || Box::pin(f())));
        self
    }

    /// Attach a command-line initializer to this component.
    pub fn with_command_initializer<I>(mut self, initializer: I) -> Self
    where
        I: CommandInitializer + 'static,
    {
        self.initializer = Some(Box::new(initializer));
        self
    }
}

#[async_trait]
impl Component for SimpleComponent {
    async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        match &self.on_start {
            Some(f) => f(ctx).await,
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        match &self.on_stop {
            Some(f) => f().await,
            None => Ok(()),
        }
    }

    async fn kill(&self) -> Result<(), ComponentError> {
        match &self.on_kill {
            Some(f) => f().await,
            None => Ok(()),
        }
    }

    fn command_initializer(&self) -> Option<&dyn CommandInitializer> {
        self.initializer.as_deref()
    }
}
