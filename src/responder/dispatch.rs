//! Failure dispatch: turns a short-circuit failure into exactly one response.
//!
//! # Resolution order
//! 1. The failure's own `Respondable` capability
//! 2. The responder registered for the failure's declared type
//! 3. The fallback (the default responder unless the caller supplies one)

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::DispatchConfig;
use crate::effect::Call;
use crate::observability::metrics;
use crate::responder::failure::Failure;
use crate::responder::registry::ResponderRegistry;

/// Which step of the resolution order produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Respondable,
    Registered,
    Fallback,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Respondable => "respondable",
            Resolution::Registered => "registered",
            Resolution::Fallback => "fallback",
        }
    }
}

/// Response used when nothing else handles a failure.
#[derive(Debug, Clone)]
pub struct DefaultResponder {
    status: StatusCode,
    expose_payload: bool,
}

impl DefaultResponder {
    pub fn new(status: StatusCode, expose_payload: bool) -> Self {
        Self { status, expose_payload }
    }

    /// Build from configuration. An unusable status falls back to 500.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let status = StatusCode::from_u16(config.default_status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, config.expose_payload)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn respond<F: Failure>(&self, failure: &F) -> Response {
        let body = if self.expose_payload {
            json!({
                "error": "unhandled_failure",
                "type": failure.failure_name(),
                "payload": failure.payload(),
            })
        } else {
            json!({ "error": "unhandled_failure" })
        };
        (self.status, Json(body)).into_response()
    }
}

impl Default for DefaultResponder {
    fn default() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, true)
    }
}

/// Shared by every route binding of one router.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ResponderRegistry>,
    default: DefaultResponder,
}

impl Dispatcher {
    pub fn new(registry: Arc<ResponderRegistry>, default: DefaultResponder) -> Self {
        Self { registry, default }
    }

    pub fn registry(&self) -> &Arc<ResponderRegistry> {
        &self.registry
    }

    /// Respond to `failure` using the default responder as the last resort.
    pub fn dispatch<F: Failure>(&self, call: &Call, failure: F) -> Response {
        let default = &self.default;
        self.resolve(call, failure, |_, failure| default.respond(&failure)).1
    }

    /// Respond to `failure`, using `fallback` when neither the failure nor
    /// the registry handles it.
    pub fn dispatch_or<F, R>(&self, call: &Call, failure: F, fallback: R) -> Response
    where
        F: Failure,
        R: FnOnce(&Call, F) -> Response,
    {
        self.resolve(call, failure, fallback).1
    }

    /// Run the resolution order and report which step answered.
    pub fn resolve<F, R>(&self, call: &Call, failure: F, fallback: R) -> (Resolution, Response)
    where
        F: Failure,
        R: FnOnce(&Call, F) -> Response,
    {
        let failure_type = failure.failure_name();

        let own = failure.as_respondable().map(|respondable| respondable.respond(call));

        let (resolution, response) = match own {
            Some(response) => (Resolution::Respondable, response),
            None => match self.registry.lookup::<F>() {
                Some(responder) => (Resolution::Registered, responder(call, failure)),
                None => {
                    tracing::warn!(
                        failure = failure_type,
                        method = %call.method(),
                        path = %call.path(),
                        "No responder registered for failure type; using fallback"
                    );
                    (Resolution::Fallback, fallback(call, failure))
                }
            },
        };

        tracing::debug!(
            failure = failure_type,
            resolution = resolution.as_str(),
            status = response.status().as_u16(),
            request_id = call.request_id().unwrap_or("-"),
            "Failure dispatched"
        );
        metrics::record_failure(failure_type, resolution);

        (resolution, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::failure::{AnyFailure, Respondable};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Invalid {
        field: String,
        reason: String,
    }
    impl Failure for Invalid {}

    #[derive(Debug)]
    struct Gone;
    impl Failure for Gone {
        fn as_respondable(&self) -> Option<&dyn Respondable> {
            Some(self)
        }
    }
    impl Respondable for Gone {
        fn respond(&self, _call: &Call) -> Response {
            StatusCode::GONE.into_response()
        }
    }

    fn call() -> Call {
        let (parts, _) = Request::builder().uri("/things").body(()).unwrap().into_parts();
        Call::new(parts, Vec::new())
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(ResponderRegistry::new()), DefaultResponder::default())
    }

    #[test]
    fn test_registered_responder_receives_value_intact() {
        let dispatcher = dispatcher();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        dispatcher.registry().register::<Invalid, _, _>(move |_, failure| {
            sink.lock().unwrap().push(failure);
            StatusCode::UNPROCESSABLE_ENTITY
        });

        let failure = Invalid { field: "name".into(), reason: "required".into() };
        let (resolution, response) = dispatcher.resolve(&call(), failure.clone(), |_, _| unreachable!());

        assert_eq!(resolution, Resolution::Registered);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(*seen.lock().unwrap(), vec![failure]);
    }

    #[test]
    fn test_unregistered_uses_default() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch(&call(), Invalid { field: "a".into(), reason: "b".into() });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_respondable_bypasses_registry() {
        let dispatcher = dispatcher();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        dispatcher.registry().register::<Gone, _, _>(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            StatusCode::OK
        });

        let (resolution, response) = dispatcher.resolve(&call(), Gone, |_, _| unreachable!());
        assert_eq!(resolution, Resolution::Respondable);
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_any_failure_does_not_match_concrete_responder() {
        let dispatcher = dispatcher();
        dispatcher.registry().register::<Invalid, _, _>(|_, _| StatusCode::UNPROCESSABLE_ENTITY);

        let wrapped = AnyFailure::new(Invalid { field: "x".into(), reason: "y".into() });
        let (resolution, response) =
            dispatcher.resolve(&call(), wrapped, |_, _| StatusCode::INTERNAL_SERVER_ERROR.into_response());
        assert_eq!(resolution, Resolution::Fallback);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_default_responder_from_config() {
        let config = DispatchConfig { default_status: 503, expose_payload: false };
        assert_eq!(DefaultResponder::from_config(&config).status(), StatusCode::SERVICE_UNAVAILABLE);

        let config = DispatchConfig { default_status: 42, expose_payload: true };
        assert_eq!(DefaultResponder::from_config(&config).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
