//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / route table produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (failure and route-miss counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - Request ID flows into every dispatch log line
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
