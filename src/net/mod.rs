//! Network foundation for server components.

pub mod listener;

pub use listener::{bind, ListenerError};
