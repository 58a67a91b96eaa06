//! Typed short-circuit failure dispatch for axum route handlers.
//!
//! Handlers run inside an [`Effect`] and return `Result<O, F>`. Unwrapping a
//! fallible step with `?` aborts the handler, and the failure is answered by,
//! in order: the failure itself when it is [`Respondable`], the responder
//! registered for its exact type, or the default 500 response.

pub mod config;
pub mod effect;
pub mod observability;
pub mod responder;
pub mod routing;

pub use config::AppConfig;
pub use effect::{Call, Effect};
pub use responder::{AnyFailure, BodyRejection, Failure, Respondable, ResponderRegistry};
pub use routing::{EitherRoute, EitherRouting, Routing, RoutingTrace};
