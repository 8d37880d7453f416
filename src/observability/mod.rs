//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gateway / policy / transform
//!     → tracing events (decision, source, template, method)
//!     → metrics.rs (decision and error counters)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, filter from RUST_LOG or config)
//!     → Prometheus scrape endpoint (binary only, when enabled)
//! ```

pub mod logging;
pub mod metrics;
