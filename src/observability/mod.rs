//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every component produces:
//!     → logging.rs (structured log events through `tracing`)
//!     → metrics.rs (counters and gauges through `metrics`)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Diagnostic server `/metrics` (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Both concerns are components placed in the Global component
//! - Log events carry an `action` field naming the lifecycle step

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfigComponent};
pub use metrics::{prometheus_handle, RuntimeMetricsComponent};
