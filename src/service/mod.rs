//! Service: the root command and entry point of a supervised process.
//!
//! # Data Flow
//! ```text
//! execute
//!     → parse command line (root + one subcommand per handler)
//!     → load config (--config), configure components from flags
//!     → Global.start
//!     → handler.start on a worker task ─┐
//!     → wait on exit channel  ◀─────────┘ (signal watcher, start failure, any component)
//!     → handler.stop ── timeout ──▶ handler.kill
//!     → Global.stop
//! ```
//!
//! # Design Decisions
//! - The service is reachable only through the `Context`, never a global
//! - The exit code, not a panic, reports a failed handler start
//! - Teardown always finishes once the kill-timeout has elapsed

mod command;
pub mod supervisor;

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use clap::{value_parser, Arg, ArgMatches, Command};

use crate::config::{load_config, LifecycleConfig};
use crate::errors::{ComponentError, ServiceError};
use crate::lifecycle::{Component, Context, ExitChannel};

pub use command::{new_command, CommandInitializer, FnInitializer, CONFIG_FLAG, KILL_TIMEOUT_FLAG};
pub use supervisor::StopOutcome;

use command::CommandHandler;

/// Exit code of a clean, signal-triggered shutdown.
pub const EXIT_OK: i32 = 0;
/// Exit code posted when the command handler fails to start.
pub const EXIT_HANDLER_START_FAILED: i32 = -1;
/// Exit code of a supervising-process construction or execution failure.
pub const EXIT_SERVICE_FAILURE: i32 = -2;

/// State shared between a [`Service`] and the handles contexts hand out.
#[derive(Debug)]
pub(crate) struct ServiceShared {
    name: String,
    exit: ExitChannel,
    config: ArcSwap<LifecycleConfig>,
}

/// A lookup handle on a running service, obtained from a [`Context`].
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    shared: Arc<ServiceShared>,
}

impl ServiceHandle {
    pub(crate) fn from_shared(shared: Arc<ServiceShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<ServiceShared> {
        &self.shared
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The active configuration.
    pub fn config(&self) -> Arc<LifecycleConfig> {
        self.shared.config.load_full()
    }

    /// Ask the supervising loop to shut down with `code`.
    ///
    /// Waits if another request is still pending. Returns `false` only if
    /// the request could not be delivered.
    pub async fn exit(&self, code: i32) -> bool {
        tracing::debug!(action = "service_exit", exit_code = code);
        self.shared.exit.request(code).await
    }

    pub(crate) async fn wait_for_exit(&self) -> Option<i32> {
        self.shared.exit.recv().await
    }

    pub(crate) async fn drain_exit(&self) -> usize {
        self.shared.exit.drain().await
    }
}

/// A construction option applied by [`Service::new`].
pub type ServiceOption = Box<dyn FnOnce(&mut Service) -> Result<(), ServiceError> + Send>;

/// The root command and supervisor of a persistent service process.
///
/// The service controls overall startup and shutdown: a Global component
/// shared by every command (logging setup and the like) and one handler
/// component per subcommand whose `start` is the main loop.
pub struct Service {
    shared: Arc<ServiceShared>,
    description: String,
    long_description: Option<String>,
    global: Option<Box<dyn Component>>,
    handlers: Vec<CommandHandler>,
    commands: Vec<Command>,
    root: Context,
}

impl Service {
    /// Build a service by applying `options` in order.
    pub fn new<I>(name: impl Into<String>, description: impl Into<String>, options: I) -> Result<Self, ServiceError>
    where
        I: IntoIterator<Item = ServiceOption>,
    {
        let mut service = Self {
            shared: Arc::new(ServiceShared {
                name: name.into(),
                exit: ExitChannel::new(),
                config: ArcSwap::from_pointee(LifecycleConfig::default()),
            }),
            description: description.into(),
            long_description: None,
            global: None,
            handlers: Vec::new(),
            commands: Vec::new(),
            root: Context::background(),
        };
        for option in options {
            option(&mut service)?;
        }
        Ok(service)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn handle(&self) -> ServiceHandle {
        ServiceHandle::from_shared(self.shared.clone())
    }

    /// A context with this service bound, derived from the root context.
    pub fn context(&self) -> Context {
        self.root.with_service(&self.handle())
    }

    pub fn config(&self) -> Arc<LifecycleConfig> {
        self.shared.config.load_full()
    }

    /// Names of the registered command handlers, in registration order.
    pub fn commands(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name.as_str()).collect()
    }

    fn has_command(&self, name: &str) -> bool {
        self.handlers.iter().any(|h| h.name == name)
            || self.commands.iter().any(|c| c.get_name() == name)
    }

    /// Look up a named child of the Global component.
    pub fn find_component(&self, name: &str) -> Option<&dyn Component> {
        self.global.as_ref().and_then(|global| global.find_component(name))
    }

    /// Ask the supervising loop to shut down with `code`.
    pub async fn exit(&self, code: i32) -> bool {
        self.handle().exit(code).await
    }

    /// Start the Global component.
    pub async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        match &self.global {
            Some(global) => {
                tracing::debug!(action = "service_start", status = "starting_global");
                global.start(ctx).await
            }
            None => Ok(()),
        }
    }

    /// Stop the Global component.
    pub async fn stop(&self) -> Result<(), ComponentError> {
        match &self.global {
            Some(global) => {
                tracing::debug!(action = "service_stop", status = "stopping_global");
                global.stop().await
            }
            None => Ok(()),
        }
    }

    /// The full command line: root command, global flags and one
    /// subcommand per handler.
    pub fn command(&self) -> Command {
        let mut root = new_command(self.name(), &self.description, self.global.as_deref())
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new(CONFIG_FLAG)
                    .long(CONFIG_FLAG)
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .global(true)
                    .help("TOML configuration file")
            );
        if let Some(long) = &self.long_description {
            root = root.long_about(long.clone());
        }
        for handler in &self.handlers {
            root = root.subcommand(handler.command());
        }
        root.subcommands(self.commands.iter().cloned())
    }

    /// Run the service with the process arguments.
    pub async fn execute(&self) -> Result<i32, ServiceError> {
        self.execute_from(std::env::args_os()).await
    }

    /// Run the service with `args` and return the exit code of the
    /// selected command.
    ///
    /// Each call runs under its own context, cancelled when the call
    /// returns; the service can be executed again afterwards.
    pub async fn execute_from<I, T>(&self, args: I) -> Result<i32, ServiceError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command().try_get_matches_from(args)?;
        let invocation = self.root.child();
        let result = self.run(&matches, &invocation).await;
        invocation.cancel();
        result
    }

    async fn run(&self, matches: &ArgMatches, invocation: &Context) -> Result<i32, ServiceError> {
        let stale = self.handle().drain_exit().await;
        if stale > 0 {
            tracing::debug!(action = "service_exit", dropped = stale, "Discarded stale exit codes");
        }

        if let Some(path) = matches.get_one::<PathBuf>(CONFIG_FLAG) {
            let config = load_config(path)?;
            tracing::debug!(action = "service_config", path = %path.display(), "Configuration loaded");
            self.shared.config.store(Arc::new(config));
        }

        let (command, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| ServiceError::UnknownCommand(String::new()))?;
        let handler = self.handlers.iter().find(|h| h.name == command);
        if handler.is_none() && !self.commands.iter().any(|c| c.get_name() == command) {
            return Err(ServiceError::UnknownCommand(command.to_string()));
        }

        if let Some(initializer) = self.global.as_ref().and_then(|g| g.command_initializer()) {
            initializer
                .command_configure(matches)
                .map_err(|source| ServiceError::Configure {
                    command: self.name().to_string(),
                    source,
                })?;
        }
        if let Some(handler) = handler {
            handler
                .configure(sub_matches)
                .map_err(|source| ServiceError::Configure {
                    command: command.to_string(),
                    source,
                })?;
        }

        let kill_timeout = sub_matches
            .try_get_one::<u64>(KILL_TIMEOUT_FLAG)
            .ok()
            .flatten()
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or_else(|| self.config().service.kill_timeout());

        let ctx = invocation.with_service(&self.handle());
        if let Err(err) = self.start(ctx.clone()).await {
            tracing::error!(
                action = "service_global_start",
                status = "error",
                error = %err,
                "Error starting global component"
            );
            return Err(ServiceError::GlobalStart(err));
        }

        let code = match handler {
            Some(handler) => {
                supervisor::run_handler(&self.handle(), ctx, handler.component.clone(), kill_timeout).await
            }
            None => {
                tracing::debug!(action = "command", command = %command, "No handler bound to command");
                EXIT_OK
            }
        };

        if let Err(err) = self.stop().await {
            tracing::error!(
                action = "service_global_stop",
                status = "error",
                error = %err,
                "Error stopping global component"
            );
            return Err(ServiceError::GlobalStop(err));
        }

        Ok(code)
    }
}

/// Set the Global component, started before and stopped after every
/// command.
pub fn with_global<C: Component + 'static>(component: C) -> ServiceOption {
    Box::new(move |service| {
        service.global = Some(Box::new(component));
        Ok(())
    })
}

/// Bind `handler` to a new subcommand; its `start` becomes the main loop.
///
/// `start` runs on a worker task and may block for the life of the
/// command (e.g. a network server). Once an exit code is posted the
/// handler is stopped, and killed if stopping outlasts the kill-timeout.
pub fn with_command_handler<C: Component + 'static>(
    name: impl Into<String>,
    description: impl Into<String>,
    handler: C,
) -> ServiceOption {
    let name = name.into();
    let description = description.into();
    Box::new(move |service| {
        if service.has_command(&name) {
            return Err(ServiceError::Construction(format!("duplicate command '{name}'")));
        }
        service.handlers.push(CommandHandler {
            name,
            description,
            component: Arc::new(handler),
        });
        Ok(())
    })
}

/// Add a plain subcommand with no lifecycle handler.
///
/// Selecting it starts and stops the Global component and exits with
/// [`EXIT_OK`].
pub fn with_command(command: Command) -> ServiceOption {
    Box::new(move |service| {
        let name = command.get_name().to_string();
        if service.has_command(&name) {
            return Err(ServiceError::Construction(format!("duplicate command '{name}'")));
        }
        service.commands.push(command);
        Ok(())
    })
}

pub fn with_long_description(description: impl Into<String>) -> ServiceOption {
    let description = description.into();
    Box::new(move |service| {
        service.long_description = Some(description);
        Ok(())
    })
}

/// Replace the default configuration. A `--config` file still wins.
pub fn with_config(config: LifecycleConfig) -> ServiceOption {
    Box::new(move |service| {
        crate::config::validation::validate_config(&config)
            .map_err(|errors| ServiceError::Config(crate::errors::ConfigError::ValidationFailed(errors)))?;
        service.shared.config.store(Arc::new(config));
        Ok(())
    })
}

/// Construct a service, run it on a new multi-threaded runtime with the
/// process arguments and exit the process with the resulting code.
///
/// Construction and execution failures exit with
/// [`EXIT_SERVICE_FAILURE`]; help and usage output exit the way clap does.
pub fn service_main<I>(name: &str, description: &str, options: I) -> !
where
    I: IntoIterator<Item = ServiceOption>,
{
    let service = match Service::new(name, description, options) {
        Ok(service) => service,
        Err(err) => {
            tracing::error!(
                action = "main",
                status = "error",
                error = %err,
                "Failed to initialize service"
            );
            std::process::exit(EXIT_SERVICE_FAILURE);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(
                action = "main",
                status = "runtime_error",
                error = %err,
                "Failed to build async runtime"
            );
            std::process::exit(EXIT_SERVICE_FAILURE);
        }
    };

    match runtime.block_on(service.execute()) {
        Ok(code) => std::process::exit(code),
        Err(ServiceError::Cli(err)) => err.exit(),
        Err(err) => {
            tracing::error!(
                action = "main",
                status = "service_error",
                error = %err,
                "Error executing service"
            );
            std::process::exit(EXIT_SERVICE_FAILURE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::SimpleComponent;

    #[test]
    fn test_duplicate_command_rejected() {
        let result = Service::new(
            "svc",
            "test",
            [
                with_command_handler("serve", "a", SimpleComponent::new()),
                with_command_handler("serve", "b", SimpleComponent::new()),
            ]
        );
        assert!(matches!(result, Err(ServiceError::Construction(_))));
    }

    #[test]
    fn test_command_lists_handlers() {
        let service = Service::new(
            "svc",
            "test",
            [
                with_long_description("longer text"),
                with_command_handler("serve", "serve it", SimpleComponent::new()),
                with_command_handler("work", "work it", SimpleComponent::new()),
            ],
        )
        .unwrap();

        assert_eq!(service.commands(), vec!["serve", "work"]);
        let cmd = service.command();
        let subs: Vec<_> = cmd.get_subcommands().map(|c| c.get_name().to_string()).collect();
        assert_eq!(subs, vec!["serve", "work"]);
        assert_eq!(cmd.get_long_about().map(ToString::to_string).as_deref(), Some("longer text"));
    }

    #[test]
    fn test_context_binds_service() {
        let service = Service::new("bound", "test", []).unwrap();
        let ctx = service.context();
        assert_eq!(ctx.service().map(|s| s.name().to_string()).as_deref(), Some("bound"));
    }

    #[test]
    fn test_context_does_not_keep_service_alive() {
        let service = Service::new("gone", "test", []).unwrap();
        let ctx = service.context();
        drop(service);
        assert!(ctx.service().is_none());
    }

    #[test]
    fn test_with_config_validates() {
        let mut config = LifecycleConfig::default();
        config.service.kill_timeout_secs = 0;
        let result = Service::new("svc", "test", [with_config(config)]);
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[test]
    fn test_plain_command_shares_namespace() {
        let result = Service::new(
            "svc",
            "test",
            [
                with_command_handler("serve", "serve it", SimpleComponent::new()),
                with_command(Command::new("serve")),
            ],
        );
        assert!(matches!(result, Err(ServiceError::Construction(_))));

        let service = Service::new(
            "svc",
            "test",
            [
                with_command_handler("serve", "serve it", SimpleComponent::new()),
                with_command(Command::new("version").about("print the version")),
            ],
        )
        .unwrap();
        let subs: Vec<_> = service.command().get_subcommands().map(|c| c.get_name().to_string()).collect();
        assert_eq!(subs, vec!["serve", "version"]);
        assert_eq!(service.commands(), vec!["serve"]);
    }

    #[tokio::test]
    async fn test_missing_subcommand_is_cli_error() {
        let service = Service::new(
            "svc",
            "test",
            [with_command_handler("serve", "serve it", SimpleComponent::new())],
        )
        .unwrap();
        let result = service.execute_from(["svc"]).await;
        assert!(matches!(result, Err(ServiceError::Cli(_))));
    }
}
