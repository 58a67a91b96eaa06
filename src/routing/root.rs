//! Root routing node: owns the responder registry of one application.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;

use crate::config::DispatchConfig;
use crate::effect::Call;
use crate::responder::{DefaultResponder, Dispatcher, Failure, ResponderRegistry};
use crate::routing::route::EitherRoute;
use crate::routing::trace::{RoutingTrace, TraceHook};

/// Root of a routing tree with typed failure dispatch.
///
/// Routes are declared directly on the root (it derefs to [`EitherRoute`]),
/// responders are registered per failure type, and the finished tree is
/// turned into an axum router.
///
/// ```ignore
/// let mut routing = EitherRouting::<AppState>::new();
/// routing.responder(|_, e: ValidationError| (StatusCode::UNPROCESSABLE_ENTITY, e.message));
/// routing.post_json("/widgets", create_widget);
/// let app = routing.into_router().with_state(state);
/// ```
pub struct EitherRouting<S = ()> {
    root: EitherRoute<S>,
    registry: Arc<ResponderRegistry>,
    hooks: Vec<TraceHook>,
}

impl<S> EitherRouting<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_default_responder(DefaultResponder::default())
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::with_default_responder(DefaultResponder::from_config(config))
    }

    pub fn with_default_responder(default: DefaultResponder) -> Self {
        let registry = Arc::new(ResponderRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone(), default);
        Self {
            root: EitherRoute::root(dispatcher),
            registry,
            hooks: Vec::new(),
        }
    }

    /// Run `configure` on this routing and return it.
    pub fn configure(mut self, configure: impl FnOnce(&mut Self)) -> Self {
        configure(&mut self);
        self
    }

    /// Register a responder for failures of type `F`.
    ///
    /// Matching is by exact declared type. A later registration for the
    /// same type replaces this one.
    pub fn responder<F, R, O>(&mut self, responder: R) -> &mut Self
    where
        F: Failure,
        R: Fn(&Call, F) -> O + Send + Sync + 'static,
        O: IntoResponse,
    {
        self.registry.register(responder);
        self
    }

    /// Register a route resolution trace hook.
    pub fn trace(&mut self, hook: impl Fn(&RoutingTrace) + Send + Sync + 'static) -> &mut Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn registry(&self) -> &Arc<ResponderRegistry> {
        &self.registry
    }

    /// Compile the routing tree into an axum router awaiting its state.
    pub fn into_router(mut self) -> axum::Router<S> {
        let table = self.root.take_table();
        tracing::info!(
            routes = table.len(),
            responders = self.registry.len(),
            "Routing compiled"
        );
        table.into_router(self.hooks.into())
    }

    /// Compile the routing tree and apply `state`.
    pub fn with_state(self, state: S) -> Routing {
        let registry = self.registry.clone();
        Routing {
            router: self.into_router().with_state(state),
            registry,
        }
    }
}

impl<S> Default for EitherRouting<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Deref for EitherRouting<S> {
    type Target = EitherRoute<S>;

    fn deref(&self) -> &EitherRoute<S> {
        &self.root
    }
}

impl<S> DerefMut for EitherRouting<S> {
    fn deref_mut(&mut self) -> &mut EitherRoute<S> {
        &mut self.root
    }
}

/// A compiled routing tree with its state applied.
#[derive(Clone)]
pub struct Routing {
    router: axum::Router,
    registry: Arc<ResponderRegistry>,
}

impl Routing {
    /// Route one request through the tree.
    pub async fn interceptor(&self, request: Request) -> Response {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        }
    }

    /// The registry shared with every binding; registration here takes
    /// effect for requests dispatched afterwards.
    pub fn registry(&self) -> &ResponderRegistry {
        &self.registry
    }

    pub fn into_router(self) -> axum::Router {
        self.router
    }
}
