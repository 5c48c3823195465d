//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Composition (named.rs, composite.rs):
//!     options → NamedComponentList → CompositeComponent
//!
//! Startup (composite.rs):
//!     child 0 → child 1 → … → child n      (first failure aborts)
//!
//! Shutdown (composite.rs, shutdown.rs):
//!     exit code posted → stop child n → … → child 0
//!                      → kill, in the same order, if stop overruns
//!
//! Signals (signals.rs):
//!     SIGHUP/SIGTERM/SIGINT → handler → Service exit channel
//! ```
//!
//! # Design Decisions
//! - Ordered startup, reverse-ordered teardown
//! - Start has no timeout; only stop is bounded (by the service)
//! - Components reach the service only through the `Context`

mod component;
mod composite;
mod context;
mod named;
pub mod shutdown;
pub mod signals;

pub use component::{Component, SimpleComponent};
pub use composite::{
    with_component, with_named_component, with_shutdown_watcher, with_teardown_policy,
    CompositeComponent, CompositeOption, TeardownPolicy, SHUTDOWN_WATCHER_NAME,
};
pub use context::Context;
pub use named::{NamedComponent, NamedComponentList};
pub use shutdown::ExitChannel;
pub use signals::{Signal, SignalWatcher, SHUTDOWN_SIGNALS};
