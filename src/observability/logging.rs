//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber when the Global component starts
//! - Contribute `--log-verbose` to the command line
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level unless verbose is set
//! - Installing twice is harmless: the first subscriber stays

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::errors::ComponentError;
use crate::lifecycle::{Component, Context};
use crate::service::CommandInitializer;

pub const VERBOSE_FLAG: &str = "log-verbose";

/// Build the filter for `level`, deferring to `RUST_LOG` unless `verbose`.
pub fn env_filter(level: &str, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging(level: &str, format: LogFormat, verbose: bool) -> bool {
    let filter = env_filter(level, verbose);
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    installed.is_ok()
}

/// Configures logging from flags and the service configuration.
#[derive(Default)]
pub struct LogConfigComponent {
    verbose: AtomicBool,
}

impl LogConfigComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Component for LogConfigComponent {
    async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        let logging = ctx
            .service()
            .map(|service| service.config().logging.clone())
            .unwrap_or_default();

        if init_logging(&logging.level, logging.format, self.verbose()) {
            tracing::debug!(
                action = "log_config",
                level = %logging.level,
                verbose = self.verbose(),
                "Logging initialized"
            );
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn kill(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn command_initializer(&self) -> Option<&dyn CommandInitializer> {
        Some(self)
    }
}

impl CommandInitializer for LogConfigComponent {
    fn command_initialize(&self, cmd: Command) -> Command {
        cmd.arg(
            Arg::new(VERBOSE_FLAG)
                .long(VERBOSE_FLAG)
                .short('v')
                .action(ArgAction::SetTrue)
                .global(true)
                .help("If enabled, emit debug level log output"),
        )
    }

    fn command_configure(&self, matches: &ArgMatches) -> Result<(), ComponentError> {
        if let Ok(Some(true)) = matches.try_get_one::<bool>(VERBOSE_FLAG) {
            self.verbose.store(true, Ordering::Relaxed);
        }
        Ok(())
    }
}
