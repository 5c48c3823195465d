//! Command-line registration hooks.

use std::sync::Arc;

use clap::{value_parser, Arg, ArgMatches, Command};

use crate::errors::ComponentError;
use crate::lifecycle::Component;

/// Flag overriding the configured kill-timeout of a command handler.
pub const KILL_TIMEOUT_FLAG: &str = "service-kill-timeout";

/// Global flag naming a TOML configuration file.
pub const CONFIG_FLAG: &str = "config";

/// Optional capability of a component: contribute to the command line.
///
/// `command_initialize` runs once before parsing, in start order and
/// depth-first through composites. `command_configure` runs once after
/// parsing, in the same order, with the matches of the same command.
pub trait CommandInitializer: Send + Sync {
    fn command_initialize(&self, cmd: Command) -> Command;

    fn command_configure(&self, _matches: &ArgMatches) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// A [`CommandInitializer`] backed by a closure.
pub struct FnInitializer<F> {
    f: F,
}

impl<F> FnInitializer<F>
where
    F: Fn(Command) -> Command + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> CommandInitializer for FnInitializer<F>
where
    F: Fn(Command) -> Command + Send + Sync,
{
    fn command_initialize(&self, cmd: Command) -> Command {
        (self.f)(cmd)
    }
}

/// Build a command and let `component` contribute its flags.
pub fn new_command(name: &str, description: &str, component: Option<&dyn Component>) -> Command {
    let cmd = Command::new(name.to_string()).about(description.to_string());
    match component.and_then(|c| c.command_initializer()) {
        Some(initializer) => initializer.command_initialize(cmd),
        None => cmd,
    }
}

/// A component bound to a subcommand; its `start` is the main loop.
pub(crate) struct CommandHandler {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) component: Arc<dyn Component>,
}

impl CommandHandler {
    pub(crate) fn command(&self) -> Command {
        new_command(&self.name, &self.description, Some(self.component.as_ref())).arg(
            Arg::new(KILL_TIMEOUT_FLAG)
                .long(KILL_TIMEOUT_FLAG)
                .value_name("SECONDS")
                .value_parser(value_parser!(u64).range(1..))
                .help("Time to wait for ordered shutdown to complete before hard exit"),
        )
    }

    pub(crate) fn configure(&self, matches: &ArgMatches) -> Result<(), ComponentError> {
        match self.component.command_initializer() {
            Some(initializer) => initializer.command_configure(matches),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::SimpleComponent;

    #[test]
    fn test_new_command_without_initializer() {
        let cmd = new_command("serve", "Run the server", Some(&SimpleComponent::new()));
        assert_eq!(cmd.get_name(), "serve");
        assert_eq!(cmd.get_arguments().count(), 0);
    }

    #[test]
    fn test_handler_command_has_kill_timeout() {
        let handler = CommandHandler {
            name: "serve".into(),
            description: "Run".into(),
            component: Arc::new(SimpleComponent::new().with_command_initializer(FnInitializer::new(
                |cmd: Command| cmd.arg(Arg::new("port").long("port")),
            ))),
        };
        let matches = handler
            .command()
            .try_get_matches_from(["serve", "--port", "80", "--service-kill-timeout", "5"])
            .unwrap();
        assert_eq!(matches.get_one::<u64>(KILL_TIMEOUT_FLAG), Some(&5));
        assert_eq!(matches.get_one::<String>("port").map(String::as_str), Some("80"));
    }

    #[test]
    fn test_zero_kill_timeout_rejected() {
        let handler = CommandHandler {
            name: "serve".into(),
            description: "Run".into(),
            component: Arc::new(SimpleComponent::new()),
        };
        assert!(handler
            .command()
            .try_get_matches_from(["serve", "--service-kill-timeout", "0"])
            .is_err());
    }
}
