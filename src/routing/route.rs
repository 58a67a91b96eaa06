//! Route nodes and the typed route binder.
//!
//! # Responsibilities
//! - Build child routes by path and selector
//! - Install handlers per verb, with or without a typed request body
//! - Run each handler inside an [`Effect`] and dispatch its failure
//!
//! # Design Decisions
//! - An empty path means "this route", so `get("", ..)` binds the current node
//! - Body decoding failures are dispatched like handler failures, with the
//!   rejection's own 4xx response as the fallback
//! - The dispatcher (and through it the responder registry) is captured by
//!   every binding; nothing is looked up from global state

use std::future::Future;
use std::mem;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::http::Method;
use axum::response::IntoResponse;
use axum::Json;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;

use crate::effect::{Call, Effect};
use crate::responder::{BodyRejection, Dispatcher, Failure};
use crate::routing::matcher::{
    AcceptMatcher, ContentTypeMatcher, HeaderMatcher, Matcher, MethodMatcher, ParamMatcher,
};
use crate::routing::table::{Binding, BoxHandler, RouteTable};

/// A request body type the binder can decode before calling a handler.
pub trait ReceiveBody: Sized + Send + 'static {
    fn receive(call: &Call, body: Body) -> impl Future<Output = Result<Self, BodyRejection>> + Send;
}

/// No body: the request body is ignored.
impl ReceiveBody for () {
    async fn receive(_call: &Call, _body: Body) -> Result<Self, BodyRejection> {
        Ok(())
    }
}

impl<T> ReceiveBody for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn receive(call: &Call, body: Body) -> Result<Self, BodyRejection> {
        Ok(Json::<T>::from_request(rebuild(call, body), &()).await?)
    }
}

impl ReceiveBody for String {
    async fn receive(call: &Call, body: Body) -> Result<Self, BodyRejection> {
        Ok(String::from_request(rebuild(call, body), &()).await?)
    }
}

/// Reassemble the request so axum's extractors see its head, including
/// extensions such as `DefaultBodyLimit`.
fn rebuild(call: &Call, body: Body) -> Request {
    Request::from_parts(call.parts().clone(), body)
}

/// A node in the routing tree.
pub struct EitherRoute<S = ()> {
    path: String,
    selectors: Vec<Arc<dyn Matcher>>,
    table: RouteTable<S>,
    dispatcher: Dispatcher,
}

impl<S> EitherRoute<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub(crate) fn root(dispatcher: Dispatcher) -> Self {
        Self {
            path: "/".to_string(),
            selectors: Vec::new(),
            table: RouteTable::default(),
            dispatcher,
        }
    }

    pub(crate) fn take_table(&mut self) -> RouteTable<S> {
        mem::take(&mut self.table)
    }

    /// Path of this node, starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of handlers bound under this node so far.
    pub fn binding_count(&self) -> usize {
        self.table.len()
    }

    fn child(&mut self, path: &str, selector: Option<Arc<dyn Matcher>>, build: impl FnOnce(&mut Self)) -> &mut Self {
        let mut selectors = self.selectors.clone();
        selectors.extend(selector);

        let mut child = EitherRoute {
            path: join_path(&self.path, path),
            selectors,
            table: self.take_table(),
            dispatcher: self.dispatcher.clone(),
        };
        build(&mut child);
        self.table = child.take_table();
        self
    }

    /// Builds a route to match `path`.
    pub fn route(&mut self, path: &str, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child(path, None, build)
    }

    /// Builds a route to match `method` and `path`.
    pub fn route_method(&mut self, path: &str, method: Method, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child(path, Some(Arc::new(MethodMatcher::new(method))), build)
    }

    /// Builds a route to match `method`.
    pub fn method(&mut self, method: Method, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.route_method("", method, build)
    }

    /// Builds a route to match requests carrying parameter `name`.
    pub fn param(&mut self, name: &str, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child("", Some(Arc::new(ParamMatcher::present(name))), build)
    }

    /// Builds a route to match parameter `name` equal to `value`.
    pub fn param_eq(&mut self, name: &str, value: &str, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child("", Some(Arc::new(ParamMatcher::equals(name, value))), build)
    }

    /// Builds a route to match header `name` with `value`.
    pub fn header(&mut self, name: &str, value: &str, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child("", Some(Arc::new(HeaderMatcher::new(name, value))), build)
    }

    /// Builds a route that may carry parameter `name`; always matches.
    pub fn optional_param(&mut self, name: &str, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child("", Some(Arc::new(ParamMatcher::optional(name))), build)
    }

    /// Builds a route guarded by an arbitrary `matcher`.
    pub fn select(&mut self, matcher: impl Matcher + 'static, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child("", Some(Arc::new(matcher)), build)
    }

    /// Builds a route to match requests whose `Accept` header admits `content_type`.
    pub fn accept(&mut self, content_type: &str, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child("", Some(Arc::new(AcceptMatcher::new(content_type))), build)
    }

    /// Builds a route to match requests whose `Content-Type` is `content_type`.
    pub fn content_type(&mut self, content_type: &str, build: impl FnOnce(&mut Self)) -> &mut Self {
        self.child("", Some(Arc::new(ContentTypeMatcher::new(content_type))), build)
    }

    /// Installs a handler on this route for any method.
    pub fn handle<F, O, H, Fut>(&mut self, handler: H) -> &mut Self
    where
        F: Failure,
        O: IntoResponse,
        H: Fn(Effect<S, F>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<O, F>> + Send + 'static,
    {
        self.bind(None, "", move |ctx, ()| handler(ctx))
    }

    /// Installs a handler for `method` at `path` that receives a decoded body `R`.
    pub fn on<F, R, O, H, Fut>(&mut self, method: Method, path: &str, handler: H) -> &mut Self
    where
        F: Failure,
        R: ReceiveBody,
        O: IntoResponse,
        H: Fn(Effect<S, F>, R) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<O, F>> + Send + 'static,
    {
        self.bind(Some(method), path, handler)
    }

    fn bind<F, R, O, H, Fut>(&mut self, method: Option<Method>, path: &str, handler: H) -> &mut Self
    where
        F: Failure,
        R: ReceiveBody,
        O: IntoResponse,
        H: Fn(Effect<S, F>, R) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<O, F>> + Send + 'static,
    {
        let full_path = join_path(&self.path, path);
        let description = describe(&full_path, method.as_ref(), &self.selectors);
        let dispatcher = self.dispatcher.clone();

        let erased: BoxHandler<S> = Arc::new(move |call: Arc<Call>, body: Body, state: S| {
            let handler = handler.clone();
            let dispatcher = dispatcher.clone();
            async move {
                let received = match R::receive(&call, body).await {
                    Ok(received) => received,
                    Err(rejection) => {
                        return dispatcher.dispatch_or(&call, rejection, |_, rejection| rejection.into_response());
                    }
                };

                match handler(Effect::new(call.clone(), state), received).await {
                    Ok(output) => output.into_response(),
                    Err(failure) => dispatcher.dispatch(&call, failure),
                }
            }
            .boxed()
        });

        self.table.insert(
            full_path,
            Binding {
                method,
                selectors: self.selectors.clone(),
                description,
                handler: erased,
            },
        );
        self
    }
}

macro_rules! verbs {
    ($( $name:ident => $method:ident ),* $(,)?) => {
        impl<S> EitherRoute<S>
        where
            S: Clone + Send + Sync + 'static,
        {
            $(
                #[doc = concat!("Builds a route to match `", stringify!($method), "` requests at `path`.")]
                pub fn $name<F, O, H, Fut>(&mut self, path: &str, handler: H) -> &mut Self
                where
                    F: Failure,
                    O: IntoResponse,
                    H: Fn(Effect<S, F>) -> Fut + Clone + Send + Sync + 'static,
                    Fut: Future<Output = Result<O, F>> + Send + 'static,
                {
                    self.bind(Some(Method::$method), path, move |ctx, ()| handler(ctx))
                }
            )*
        }
    };
}

verbs! {
    get => GET,
    post => POST,
    put => PUT,
    patch => PATCH,
    delete => DELETE,
    head => HEAD,
    options => OPTIONS,
}

macro_rules! json_verbs {
    ($( $name:ident => $method:ident ),* $(,)?) => {
        impl<S> EitherRoute<S>
        where
            S: Clone + Send + Sync + 'static,
        {
            $(
                #[doc = concat!("Builds a route to match `", stringify!($method), "` requests at `path` with a JSON body of type `R`.")]
                pub fn $name<F, R, O, H, Fut>(&mut self, path: &str, handler: H) -> &mut Self
                where
                    F: Failure,
                    R: DeserializeOwned + Send + 'static,
                    O: IntoResponse,
                    H: Fn(Effect<S, F>, R) -> Fut + Clone + Send + Sync + 'static,
                    Fut: Future<Output = Result<O, F>> + Send + 'static,
                {
                    self.bind(Some(Method::$method), path, move |ctx, Json(body): Json<R>| handler(ctx, body))
                }
            )*
        }
    };
}

json_verbs! {
    post_json => POST,
    put_json => PUT,
    patch_json => PATCH,
}

/// Join a child path onto a parent, normalizing slashes.
pub(crate) fn join_path(base: &str, path: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(path.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

fn describe(path: &str, method: Option<&Method>, selectors: &[Arc<dyn Matcher>]) -> String {
    let mut parts = vec![path.to_string()];
    parts.extend(selectors.iter().map(|s| s.describe()));
    if let Some(method) = method {
        parts.push(MethodMatcher::new(method.clone()).describe());
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", ""), "/");
        assert_eq!(join_path("/", "widgets"), "/widgets");
        assert_eq!(join_path("/api/", "/widgets/{id}/"), "/api/widgets/{id}");
        assert_eq!(join_path("/api", "v1//items"), "/api/v1/items");
    }

    #[test]
    fn test_describe_renders_selectors() {
        let selectors: Vec<Arc<dyn Matcher>> = vec![Arc::new(HeaderMatcher::new("x-beta", "1"))];
        assert_eq!(
            describe("/items", Some(&Method::GET), &selectors),
            "/items/[x-beta=1]/(method:GET)"
        );
        assert_eq!(describe("/items", None, &[]), "/items");
    }
}
