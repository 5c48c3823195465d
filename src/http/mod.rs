//! HTTP components.
//!
//! # Data Flow
//! ```text
//! Service start
//!     → server.rs (bind, serve router on a background task)
//!     → diagnostics.rs (metrics and status for operators)
//! Service stop
//!     → graceful shutdown, abort on kill
//! ```

pub mod diagnostics;
pub mod server;

pub use diagnostics::{DiagnosticServer, DiagnosticStatus};
pub use server::{HttpService, HTTP_ADDR_FLAG};
