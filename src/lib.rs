//! Service Lifecycle Library
//!
//! Ordered startup and teardown for long-running processes: components,
//! composites, signal handling and a supervising command-line service.

// Core lifecycle
pub mod errors;
pub mod lifecycle;
pub mod service;

// Configuration
pub mod config;

// Peripheral components
pub mod http;
pub mod net;
pub mod observability;

pub use config::LifecycleConfig;
pub use errors::{ComponentError, ConfigError, ServiceError};
pub use lifecycle::{
    with_component, with_named_component, with_shutdown_watcher, with_teardown_policy, Component,
    CompositeComponent, Context, NamedComponentList, SignalWatcher, SimpleComponent, TeardownPolicy,
};
pub use service::{
    service_main, with_command, with_command_handler, with_config, with_global,
    with_long_description, Service, ServiceHandle, ServiceOption,
};
