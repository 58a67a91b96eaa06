//! The effect context handed to every bound handler.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::effect::call::Call;
use crate::responder::failure::{AnyFailure, Failure};

/// Per-request context pairing the [`Call`] and application state with the
/// abort channel for failures of type `F`.
///
/// Aborting is plain `?`: every operation here returns `Result<_, F>`, and
/// propagating the `Err` ends the handler body at that statement. The route
/// binder receives the failure exactly once and dispatches it.
///
/// ```ignore
/// async fn create(ctx: Effect<AppState, ValidationError>, body: NewWidget)
///     -> Result<(StatusCode, Json<Widget>), ValidationError>
/// {
///     ctx.ensure(!body.name.is_empty(), || ValidationError::new("name required"))?;
///     let widget = ctx.bind(Widget::try_from(body))?;
///     Ok((StatusCode::CREATED, Json(widget)))
/// }
/// ```
pub struct Effect<S, F = AnyFailure> {
    call: Arc<Call>,
    state: S,
    _failure: PhantomData<fn() -> F>,
}

impl<S, F: Failure> Effect<S, F> {
    pub(crate) fn new(call: Arc<Call>, state: S) -> Self {
        Self {
            call,
            state,
            _failure: PhantomData,
        }
    }

    pub fn call(&self) -> &Call {
        &self.call
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Unwrap a success value, or abort with the failure converted into `F`.
    pub fn bind<T, E>(&self, value: Result<T, E>) -> Result<T, F>
    where
        E: Into<F>,
    {
        value.map_err(|error| self.abort(error.into()))
    }

    /// Unwrap `Some`, or abort with the failure built by `failure`.
    pub fn bind_option<T>(&self, value: Option<T>, failure: impl FnOnce() -> F) -> Result<T, F> {
        value.ok_or_else(|| self.abort(failure()))
    }

    /// Abort unless `condition` holds.
    pub fn ensure(&self, condition: bool, failure: impl FnOnce() -> F) -> Result<(), F> {
        if condition {
            Ok(())
        } else {
            Err(self.abort(failure()))
        }
    }

    /// Abort unconditionally.
    pub fn fail<T>(&self, failure: impl Into<F>) -> Result<T, F> {
        Err(self.abort(failure.into()))
    }

    fn abort(&self, failure: F) -> F {
        tracing::debug!(
            failure = std::any::type_name::<F>(),
            method = %self.call.method(),
            path = %self.call.path(),
            "Handler aborted"
        );
        failure
    }
}

impl<S> Effect<S, AnyFailure> {
    /// Like [`Effect::bind`] for untyped routes: any failure type is erased
    /// into [`AnyFailure`].
    pub fn bind_any<T, E: Failure>(&self, value: Result<T, E>) -> Result<T, AnyFailure> {
        value.map_err(|error| self.abort(AnyFailure::new(error)))
    }
}

impl<S, F> Deref for Effect<S, F> {
    type Target = Call;

    fn deref(&self) -> &Call {
        &self.call
    }
}

impl<S, F> fmt::Debug for Effect<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("call", &self.call)
            .field("failure", &std::any::type_name::<F>())
            .finish()
    }
}
