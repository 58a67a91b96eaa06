//! Route selectors.
//!
//! # Responsibilities
//! - Match the request method
//! - Match header values, `Accept` and `Content-Type`
//! - Match parameters (path parameters first, then the query string)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Header values compare ASCII case-insensitively
//! - Media types compare without their parameters (`; charset=...`)
//! - A missing `Accept` header accepts everything
//! - No regex, every selector is a linear scan

use std::fmt;
use std::sync::Arc;

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::Method;

use crate::effect::Call;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, call: &Call) -> bool;

    /// Segment used when rendering a route for traces.
    fn describe(&self) -> String;

    /// Returns false if this condition can never hold for `method`.
    ///
    /// Used to tell a wrong method (405) from other mismatches (404).
    fn accepts_method(&self, _method: &Method) -> bool {
        true
    }
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, call: &Call) -> bool {
        *call.method() == self.method
    }

    fn describe(&self) -> String {
        format!("(method:{})", self.method)
    }

    fn accepts_method(&self, method: &Method) -> bool {
        *method == self.method
    }
}

/// Matches when any comma-separated value of a header equals `value`.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: String,
    value: String,
}

impl HeaderMatcher {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, call: &Call) -> bool {
        call.headers()
            .get_all(self.name.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|v| v.trim().eq_ignore_ascii_case(&self.value))
    }

    fn describe(&self) -> String {
        format!("[{}={}]", self.name, self.value)
    }
}

/// Matches when the `Accept` header admits `content_type`.
#[derive(Debug, Clone)]
pub struct AcceptMatcher {
    content_type: String,
}

impl AcceptMatcher {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: media_type(&content_type.into()),
        }
    }
}

impl Matcher for AcceptMatcher {
    fn matches(&self, call: &Call) -> bool {
        let Some(accept) = call.headers().get(ACCEPT).and_then(|v| v.to_str().ok()) else {
            return true;
        };
        let (kind, _) = self.content_type.split_once('/').unwrap_or((self.content_type.as_str(), ""));

        accept.split(',').map(media_type).any(|candidate| {
            candidate == "*/*"
                || candidate == self.content_type
                || candidate
                    .strip_suffix("/*")
                    .is_some_and(|prefix| prefix == kind)
        })
    }

    fn describe(&self) -> String {
        format!("(accept:{})", self.content_type)
    }
}

/// Matches the media type of the `Content-Type` header.
#[derive(Debug, Clone)]
pub struct ContentTypeMatcher {
    content_type: String,
}

impl ContentTypeMatcher {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: media_type(&content_type.into()),
        }
    }
}

impl Matcher for ContentTypeMatcher {
    fn matches(&self, call: &Call) -> bool {
        call.headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| media_type(v) == self.content_type)
            .unwrap_or(false)
    }

    fn describe(&self) -> String {
        format!("[{}={}]", CONTENT_TYPE, self.content_type)
    }
}

#[derive(Debug, Clone)]
enum ParamRule {
    Present,
    Equals(String),
    Optional,
}

/// Matches a parameter by presence or value. An optional parameter always matches.
#[derive(Debug, Clone)]
pub struct ParamMatcher {
    name: String,
    rule: ParamRule,
}

impl ParamMatcher {
    pub fn present(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: ParamRule::Present,
        }
    }

    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: ParamRule::Equals(value.into()),
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: ParamRule::Optional,
        }
    }
}

impl Matcher for ParamMatcher {
    fn matches(&self, call: &Call) -> bool {
        match &self.rule {
            ParamRule::Optional => true,
            ParamRule::Present => call.param(&self.name).is_some(),
            ParamRule::Equals(expected) => call.param(&self.name).is_some_and(|actual| actual == *expected),
        }
    }

    fn describe(&self) -> String {
        match &self.rule {
            ParamRule::Equals(value) => format!("[{}={}]", self.name, value),
            ParamRule::Present => format!("{{{}}}", self.name),
            ParamRule::Optional => format!("{{{}?}}", self.name),
        }
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct AndMatcher {
    matchers: Vec<Arc<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Arc<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, call: &Call) -> bool {
        self.matchers.iter().all(|m| m.matches(call))
    }

    fn describe(&self) -> String {
        self.matchers.iter().map(|m| m.describe()).collect::<Vec<_>>().join("/")
    }

    fn accepts_method(&self, method: &Method) -> bool {
        self.matchers.iter().all(|m| m.accepts_method(method))
    }
}

/// `type/subtype` without parameters, lowercased.
fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn call(builder: axum::http::request::Builder) -> Call {
        let (parts, _) = builder.body(()).unwrap().into_parts();
        Call::new(parts, Vec::new())
    }

    #[test]
    fn test_method_matcher() {
        let matcher = MethodMatcher::new(Method::POST);
        assert!(matcher.matches(&call(Request::builder().method("POST").uri("/"))));
        assert!(!matcher.matches(&call(Request::builder().method("GET").uri("/"))));
    }

    #[test]
    fn test_header_matcher() {
        let matcher = HeaderMatcher::new("X-Api-Version", "v2");

        let req = call(Request::builder().header("x-api-version", "v1, V2"));
        assert!(matcher.matches(&req));

        let req = call(Request::builder().header("x-api-version", "v1"));
        assert!(!matcher.matches(&req));

        assert!(!matcher.matches(&call(Request::builder())));
    }

    #[test]
    fn test_accept_matcher() {
        let matcher = AcceptMatcher::new("application/json");

        assert!(matcher.matches(&call(Request::builder())));
        assert!(matcher.matches(&call(Request::builder().header("accept", "text/html, */*;q=0.1"))));
        assert!(matcher.matches(&call(Request::builder().header("accept", "application/*"))));
        assert!(matcher.matches(&call(Request::builder().header("accept", "Application/JSON"))));
        assert!(!matcher.matches(&call(Request::builder().header("accept", "text/html"))));
    }

    #[test]
    fn test_content_type_matcher() {
        let matcher = ContentTypeMatcher::new("application/json");

        let req = call(Request::builder().header("content-type", "application/json; charset=utf-8"));
        assert!(matcher.matches(&req));
        assert!(!matcher.matches(&call(Request::builder().header("content-type", "text/plain"))));
        assert!(!matcher.matches(&call(Request::builder())));
    }

    #[test]
    fn test_param_matcher() {
        let present = ParamMatcher::present("debug");
        let equals = ParamMatcher::equals("format", "csv");

        let req = call(Request::builder().uri("/report?debug=1&format=csv"));
        assert!(present.matches(&req));
        assert!(equals.matches(&req));

        let req = call(Request::builder().uri("/report?format=json"));
        assert!(!present.matches(&req));
        assert!(!equals.matches(&req));
    }

    #[test]
    fn test_optional_param_always_matches() {
        let optional = ParamMatcher::optional("page");
        assert!(optional.matches(&call(Request::builder().uri("/report?page=2"))));
        assert!(optional.matches(&call(Request::builder().uri("/report"))));
        assert_eq!(optional.describe(), "{page?}");
    }

    #[test]
    fn test_method_acceptance() {
        let put = MethodMatcher::new(Method::PUT);
        assert!(put.accepts_method(&Method::PUT));
        assert!(!put.accepts_method(&Method::GET));
        assert!(HeaderMatcher::new("x-beta", "1").accepts_method(&Method::GET));

        let and = AndMatcher::new(vec![Arc::new(put), Arc::new(ParamMatcher::present("q"))]);
        assert!(!and.accepts_method(&Method::GET));
        assert!(and.accepts_method(&Method::PUT));
    }

    #[test]
    fn test_and_matcher() {
        let matcher = AndMatcher::new(vec![
            Arc::new(MethodMatcher::new(Method::GET)),
            Arc::new(ParamMatcher::present("q")),
        ]);
        assert!(matcher.matches(&call(Request::builder().uri("/search?q=rust"))));
        assert!(!matcher.matches(&call(Request::builder().method("POST").uri("/search?q=rust"))));
        assert_eq!(matcher.describe(), "(method:GET)/{q}");
    }
}
