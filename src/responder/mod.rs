//! Failure responders.
//!
//! # Data Flow
//! ```text
//! handler returns Err(failure: F)
//!     → dispatch.rs (resolution order)
//!         → failure.as_respondable()      (self-describing response)
//!         → registry.rs lookup::<F>()     (exact declared type)
//!         → DefaultResponder              (configured 5xx + payload)
//!     → exactly one Response
//! ```

pub mod dispatch;
pub mod failure;
pub mod registry;

pub use dispatch::{DefaultResponder, Dispatcher, Resolution};
pub use failure::{AnyFailure, BodyRejection, Failure, Respondable};
pub use registry::{Responder, ResponderRegistry};
