//! Failure values that a handler can short-circuit with.
//!
//! # Design Decisions
//! - A failure is identified by its declared (static) type, never by a
//!   runtime subtype relation
//! - `Respondable` is an optional capability reached through
//!   [`Failure::as_respondable`], the same shape as `Error::source`
//! - `AnyFailure` is the top-level type used by routes that declare no
//!   failure type of their own

use std::any::{type_name, TypeId};
use std::fmt;

use axum::extract::rejection::{JsonRejection, StringRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;

use crate::effect::Call;

/// A value that aborts a handler and is turned into a response.
pub trait Failure: fmt::Debug + Send + 'static {
    /// Body payload used by the default responder.
    fn payload(&self) -> Value {
        Value::String(format!("{self:?}"))
    }

    /// Type name reported in logs, metrics and the default response body.
    fn failure_name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// Returns the failure's own response writer, if it has one.
    ///
    /// When this returns `Some`, dispatch uses it and skips the registry.
    fn as_respondable(&self) -> Option<&dyn Respondable> {
        None
    }
}

/// A failure that knows how to respond to the request itself.
pub trait Respondable {
    fn respond(&self, call: &Call) -> Response;
}

impl Failure for String {
    fn payload(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Failure for &'static str {
    fn payload(&self) -> Value {
        Value::String((*self).to_string())
    }
}

impl Failure for Value {
    fn payload(&self) -> Value {
        self.clone()
    }
}

impl Failure for StatusCode {
    fn payload(&self) -> Value {
        Value::from(self.as_u16())
    }

    fn as_respondable(&self) -> Option<&dyn Respondable> {
        Some(self)
    }
}

impl Respondable for StatusCode {
    fn respond(&self, _call: &Call) -> Response {
        self.into_response()
    }
}

/// Type-erased failure, the declared type of routes without one.
///
/// Responders registered for a concrete type never match an `AnyFailure`;
/// only a responder registered for `AnyFailure` itself does.
pub struct AnyFailure {
    inner: Box<dyn Failure>,
    type_id: TypeId,
    type_name: &'static str,
}

impl AnyFailure {
    pub fn new<F: Failure>(failure: F) -> Self {
        Self {
            inner: Box::new(failure),
            type_id: TypeId::of::<F>(),
            type_name: type_name::<F>(),
        }
    }

    /// Returns true if the wrapped value was created from an `F`.
    pub fn is<F: Failure>(&self) -> bool {
        self.type_id == TypeId::of::<F>()
    }

    /// Type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for AnyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl Failure for AnyFailure {
    fn payload(&self) -> Value {
        self.inner.payload()
    }

    fn failure_name(&self) -> &'static str {
        self.type_name
    }

    fn as_respondable(&self) -> Option<&dyn Respondable> {
        self.inner.as_respondable()
    }
}

/// The request body could not be decoded into the declared body type.
#[derive(Debug, Error)]
pub enum BodyRejection {
    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Text(#[from] StringRejection),
}

impl BodyRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyRejection::Json(rejection) => rejection.status(),
            BodyRejection::Text(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        match self {
            BodyRejection::Json(rejection) => rejection.into_response(),
            BodyRejection::Text(rejection) => rejection.into_response(),
        }
    }
}

impl Failure for BodyRejection {
    fn payload(&self) -> Value {
        Value::String(self.to_string())
    }
}
