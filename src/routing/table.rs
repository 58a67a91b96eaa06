//! Route table: bindings grouped by path, compiled into an axum router.
//!
//! # Design Decisions
//! - axum owns path matching; each path gets one axum route
//! - Bindings on the same path are tried in declaration order, first match wins
//! - No binding accepts the method → 405; a method matches but another
//!   selector rejects → 404
//! - Immutable once compiled

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, RawPathParams, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use futures_util::future::BoxFuture;

use crate::effect::Call;
use crate::observability::metrics;
use crate::routing::matcher::Matcher;
use crate::routing::trace::{RoutingTrace, TraceHook};

/// Type-erased bound handler: decodes the body, runs the effect, dispatches.
pub(crate) type BoxHandler<S> = Arc<dyn Fn(Arc<Call>, Body, S) -> BoxFuture<'static, Response> + Send + Sync>;

pub(crate) struct Binding<S> {
    pub(crate) method: Option<Method>,
    pub(crate) selectors: Vec<Arc<dyn Matcher>>,
    pub(crate) description: String,
    pub(crate) handler: BoxHandler<S>,
}

impl<S> Binding<S> {
    fn accepts_method(&self, method: &Method) -> bool {
        self.method.as_ref().map_or(true, |m| m == method)
            && self.selectors.iter().all(|s| s.accepts_method(method))
    }

    fn matches(&self, call: &Call) -> bool {
        self.accepts_method(call.method()) && self.selectors.iter().all(|s| s.matches(call))
    }
}

pub(crate) struct RouteTable<S> {
    paths: BTreeMap<String, Vec<Binding<S>>>,
}

impl<S> Default for RouteTable<S> {
    fn default() -> Self {
        Self {
            paths: BTreeMap::new(),
        }
    }
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub(crate) fn insert(&mut self, path: String, binding: Binding<S>) {
        tracing::debug!(route = %binding.description, "Route bound");
        self.paths.entry(path).or_default().push(binding);
    }

    pub(crate) fn len(&self) -> usize {
        self.paths.values().map(Vec::len).sum()
    }

    /// Compile into an axum router, one axum route per path.
    pub(crate) fn into_router(self, hooks: Arc<[TraceHook]>) -> axum::Router<S> {
        let mut router = axum::Router::new();

        for (path, bindings) in self.paths {
            let path_set = Arc::new(PathBindings {
                template: path.clone(),
                bindings,
                hooks: hooks.clone(),
            });

            router = router.route(
                &path,
                any(move |State(state): State<S>, request: Request| {
                    let path_set = path_set.clone();
                    async move { path_set.resolve(state, request).await }
                }),
            );
        }

        router
    }
}

struct PathBindings<S> {
    template: String,
    bindings: Vec<Binding<S>>,
    hooks: Arc<[TraceHook]>,
}

impl<S> PathBindings<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn resolve(&self, state: S, request: Request) -> Response {
        let (mut parts, body) = request.into_parts();
        let params = RawPathParams::from_request_parts(&mut parts, &state)
            .await
            .map(|raw| {
                raw.iter()
                    .map(|(key, value)| (key.to_owned(), value.to_owned()))
                    .collect()
            })
            .unwrap_or_default();
        let call = Arc::new(Call::new(parts, params));

        let mut trace = RoutingTrace::new(call.method().clone(), call.path(), self.template.as_str());
        for binding in &self.bindings {
            trace.record(&binding.description, binding.matches(&call));
        }
        for hook in self.hooks.iter() {
            hook(&trace);
        }

        match trace.selected {
            Some(index) => (self.bindings[index].handler)(call, body, state).await,
            None => {
                let status = if self.bindings.iter().any(|b| b.accepts_method(call.method())) {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::METHOD_NOT_ALLOWED
                };
                tracing::debug!(
                    method = %call.method(),
                    path = %call.path(),
                    status = status.as_u16(),
                    "No binding selected"
                );
                metrics::record_route_miss(status.as_u16());
                status.into_response()
            }
        }
    }
}
