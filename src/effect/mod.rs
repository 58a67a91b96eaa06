//! Either-effect adapter for route handlers.
//!
//! # Responsibilities
//! - `call.rs`: request head, path/query parameters, extensions
//! - `context.rs`: `Effect<S, F>`, the call plus state plus the abort channel
//!
//! # Design Decisions
//! - Aborting is `?` on a `Result<_, F>`; nothing after the abort point runs
//! - The effect is moved into the handler, one per request, never shared
//! - `Effect` derefs to `Call`, so request access is unchanged by the adapter

pub mod call;
pub mod context;

pub use call::Call;
pub use context::Effect;
