//! Route resolution traces.
//!
//! A trace records, for one request, every binding declared on the matched
//! path, whether its selectors matched, and which binding was selected.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

/// Callback receiving one trace per resolved request.
pub type TraceHook = Arc<dyn Fn(&RoutingTrace) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Rendered route: path template followed by its selectors.
    pub route: String,
    pub matched: bool,
}

#[derive(Debug, Clone)]
pub struct RoutingTrace {
    pub method: Method,
    /// Request path as received.
    pub path: String,
    /// Path template the router matched.
    pub template: String,
    pub candidates: Vec<TraceEntry>,
    /// Index into `candidates` of the binding that handles the request.
    pub selected: Option<usize>,
}

impl RoutingTrace {
    pub(crate) fn new(method: Method, path: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            template: template.into(),
            candidates: Vec::new(),
            selected: None,
        }
    }

    pub(crate) fn record(&mut self, route: &str, matched: bool) {
        if matched && self.selected.is_none() {
            self.selected = Some(self.candidates.len());
        }
        self.candidates.push(TraceEntry {
            route: route.to_string(),
            matched,
        });
    }

    /// The selected binding's rendered route.
    pub fn selected_route(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.candidates.get(i))
            .map(|entry| entry.route.as_str())
    }
}

impl fmt::Display for RoutingTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trace for {} {} (route {})", self.method, self.path, self.template)?;
        for (i, entry) in self.candidates.iter().enumerate() {
            let marker = if Some(i) == self.selected {
                "SELECTED"
            } else if entry.matched {
                "matched"
            } else {
                "-"
            };
            writeln!(f, "  {} {}", entry.route, marker)?;
        }
        match self.selected_route() {
            Some(route) => write!(f, "Matched routes: {route}"),
            None => write!(f, "No matched routes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_is_selected() {
        let mut trace = RoutingTrace::new(Method::GET, "/items", "/items");
        trace.record("/items/(method:POST)", false);
        trace.record("/items/(method:GET)/[x-beta=1]", true);
        trace.record("/items/(method:GET)", true);

        assert_eq!(trace.selected, Some(1));
        assert_eq!(trace.selected_route(), Some("/items/(method:GET)/[x-beta=1]"));

        let rendered = trace.to_string();
        assert!(rendered.starts_with("Trace for GET /items"));
        assert!(rendered.contains("/items/(method:GET)/[x-beta=1] SELECTED"));
        assert!(rendered.contains("/items/(method:GET) matched"));
    }

    #[test]
    fn test_no_match() {
        let mut trace = RoutingTrace::new(Method::DELETE, "/items", "/items");
        trace.record("/items/(method:GET)", false);
        assert_eq!(trace.selected_route(), None);
        assert!(trace.to_string().ends_with("No matched routes"));
    }
}
