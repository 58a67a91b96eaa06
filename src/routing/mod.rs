//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route declaration (at startup):
//!     EitherRouting (root.rs)
//!     → EitherRoute children by path and selector (route.rs)
//!     → typed handlers erased into bindings (table.rs)
//!     → compiled into an axum Router, one route per path
//!
//! Incoming Request:
//!     axum path match
//!     → matcher.rs (evaluate selectors per binding)
//!     → trace.rs (report candidates to trace hooks)
//!     → selected binding: decode body, run Effect, dispatch failure
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: first matching binding in declaration order wins

pub mod matcher;
pub mod root;
pub mod route;
pub(crate) mod table;
pub mod trace;

pub use matcher::Matcher;
pub use root::{EitherRouting, Routing};
pub use route::{EitherRoute, ReceiveBody};
pub use trace::{RoutingTrace, TraceEntry, TraceHook};
