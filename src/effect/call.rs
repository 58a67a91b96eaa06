//! Per-request pipeline context.

use std::fmt;

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;

/// Request head plus the path parameters captured by the router.
///
/// The body is not part of the call; it is consumed by the route binder
/// before the handler runs.
pub struct Call {
    parts: Parts,
    params: Vec<(String, String)>,
}

impl Call {
    pub fn new(parts: Parts, params: Vec<(String, String)>) -> Self {
        Self { parts, params }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// First value of header `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of the `x-request-id` header set by the request id layer.
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn path_params(&self) -> &[(String, String)] {
        &self.params
    }

    /// First query parameter called `name`, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&self.parts.uri).ok()?;
        pairs.into_iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// Parameter lookup: path parameters first, then the query string.
    pub fn param(&self, name: &str) -> Option<String> {
        self.path_param(name)
            .map(str::to_owned)
            .or_else(|| self.query_param(name))
    }

    /// Deserialize the whole query string into `T`.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, QueryRejection> {
        Query::<T>::try_from_uri(&self.parts.uri).map(|Query(value)| value)
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.parts.extensions.get::<T>()
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde::Deserialize;

    fn call(uri: &str, params: &[(&str, &str)]) -> Call {
        let (parts, _) = Request::builder()
            .uri(uri)
            .header("x-request-id", "req-1")
            .body(())
            .unwrap()
            .into_parts();
        let params = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Call::new(parts, params)
    }

    #[test]
    fn test_path_params_shadow_query() {
        let call = call("/widgets/7?id=9&color=dark%20red", &[("id", "7")]);
        assert_eq!(call.param("id").as_deref(), Some("7"));
        assert_eq!(call.param("color").as_deref(), Some("dark red"));
        assert_eq!(call.param("missing"), None);
        assert_eq!(call.query_param("id").as_deref(), Some("9"));
    }

    #[test]
    fn test_typed_query() {
        #[derive(Deserialize)]
        struct Page {
            limit: u32,
        }

        let call = call("/widgets?limit=20", &[]);
        assert_eq!(call.query::<Page>().unwrap().limit, 20);
        assert!(self::call("/widgets?limit=x", &[]).query::<Page>().is_err());
    }

    #[test]
    fn test_request_head_access() {
        let call = call("/widgets", &[]);
        assert_eq!(*call.method(), Method::GET);
        assert_eq!(call.path(), "/widgets");
        assert_eq!(call.request_id(), Some("req-1"));
    }
}
