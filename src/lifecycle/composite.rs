//! Ordered composition of components.

use async_trait::async_trait;
use clap::{ArgMatches, Command};

use crate::errors::ComponentError;
use crate::lifecycle::{Component, Context, NamedComponentList, SignalWatcher};
use crate::service::CommandInitializer;

/// What a composite does when a child fails during stop or kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownPolicy {
    /// Abort at the first failing child; remaining children are left
    /// untouched.
    #[default]
    FailFast,
    /// Visit every child and report all failures together.
    BestEffort,
}

/// A construction option applied by [`CompositeComponent::new`].
pub type CompositeOption = Box<dyn FnOnce(&mut CompositeComponent) -> Result<(), ComponentError> + Send>;

/// A component that forwards its lifecycle to an ordered list of children.
///
/// Children start in insertion order and stop or die in the exact
/// reverse order. Start is always fail-fast with no rollback of the
/// children already started.
#[derive(Debug, Default)]
pub struct CompositeComponent {
    children: NamedComponentList,
    teardown: TeardownPolicy,
}

#[derive(Clone, Copy)]
enum Phase {
    Stop,
    Kill,
}

impl Phase {
    fn action(self) -> &'static str {
        match self {
            Phase::Stop => "stop_composite_component",
            Phase::Kill => "kill_composite_component",
        }
    }
}

impl CompositeComponent {
    /// Build a composite by applying `options` in order.
    ///
    /// The first failing option aborts construction.
    pub fn new<I>(options: I) -> Result<Self, ComponentError>
    where
        I: IntoIterator<Item = CompositeOption>,
    {
        let mut composite = Self::default();
        for option in options {
            option(&mut composite)?;
        }
        Ok(composite)
    }

    /// Append an anonymous child.
    pub fn push<C: Component + 'static>(mut self, component: C) -> Self {
        self.children.push_back(component);
        self
    }

    /// Append a named child.
    pub fn push_named<C: Component + 'static>(mut self, name: impl Into<String>, component: C) -> Self {
        self.children.push_back_named(name, component);
        self
    }

    pub fn children(&self) -> &NamedComponentList {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut NamedComponentList {
        &mut self.children
    }

    pub fn teardown_policy(&self) -> TeardownPolicy {
        self.teardown
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    async fn teardown(&self, phase: Phase) -> Result<(), ComponentError> {
        let mut failures = Vec::new();

        for (index, child) in self.children.iter().enumerate().rev() {
            tracing::debug!(
                action = phase.action(),
                component_index = index,
                component_name = %child.name
            );
            let result = match phase {
                Phase::Stop => child.component.stop().await,
                Phase::Kill => child.component.kill().await,
            };
            let Err(source) = result else { continue };

            tracing::error!(
                action = phase.action(),
                status = "error",
                component_index = index,
                component_name = %child.name,
                error = %source
            );
            let source = Box::new(source);
            let name = child.name.clone();
            let err = match phase {
                Phase::Stop => ComponentError::Stop { index, name, source },
                Phase::Kill => ComponentError::Kill { index, name, source },
            };
            match self.teardown {
                TeardownPolicy::FailFast => return Err(err),
                TeardownPolicy::BestEffort => failures.push(err),
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(ComponentError::Multiple(failures)),
        }
    }
}

/// Option adding an anonymous child.
pub fn with_component<C: Component + 'static>(component: C) -> CompositeOption {
    Box::new(move |composite| {
        composite.children.push_back(component);
        Ok(())
    })
}

/// Option adding a named child.
pub fn with_named_component<C: Component + 'static>(name: impl Into<String>, component: C) -> CompositeOption {
    let name = name.into();
    Box::new(move |composite| {
        composite.children.push_back_named(name, component);
        Ok(())
    })
}

/// Name given to the child added by [`with_shutdown_watcher`].
pub const SHUTDOWN_WATCHER_NAME: &str = "shutdown-watcher";

/// Option adding the default shutdown [`SignalWatcher`] as a child named
/// `shutdown-watcher`.
pub fn with_shutdown_watcher() -> CompositeOption {
    with_named_component(SHUTDOWN_WATCHER_NAME, SignalWatcher::shutdown())
}

/// Option selecting how stop and kill handle a failing child.
pub fn with_teardown_policy(policy: TeardownPolicy) -> CompositeOption {
    Box::new(move |composite| {
        composite.teardown = policy;
        Ok(())
    })
}

#[async_trait]
impl Component for CompositeComponent {
    async fn start(&self, ctx: Context) -> Result<(), ComponentError> {
        for (index, child) in self.children.iter().enumerate() {
            tracing::debug!(
                action = "start_composite_component",
                component_index = index,
                component_name = %child.name
            );
            if let Err(source) = child.component.start(ctx.clone()).await {
                tracing::error!(
                    action = "start_composite_component",
                    status = "error",
                    component_index = index,
                    component_name = %child.name,
                    error = %source
                );
                return Err(ComponentError::Start {
                    index,
                    name: child.name.clone(),
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.teardown(Phase::Stop).await
    }

    async fn kill(&self) -> Result<(), ComponentError> {
        self.teardown(Phase::Kill).await
    }

    fn command_initializer(&self) -> Option<&dyn CommandInitializer> {
        Some(self)
    }

    fn find_component(&self, name: &str) -> Option<&dyn Component> {
        self.children.find_component(name)
    }
}

impl CommandInitializer for CompositeComponent {
    fn command_initialize(&self, mut cmd: Command) -> Command {
        for child in &self.children {
            if let Some(initializer) = child.component.command_initializer() {
                cmd = initializer.command_initialize(cmd);
            }
        }
        cmd
    }

    fn command_configure(&self, matches: &ArgMatches) -> Result<(), ComponentError> {
        for child in &self.children {
            if let Some(initializer) = child.component.command_initializer() {
                initializer.command_configure(matches)?;
            }
        }
        Ok(())
    }
}
