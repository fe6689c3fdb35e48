//! Request accessors used by the router.
//!
//! The router never sees the HTTP stack directly. It needs the method (for
//! verb-prefixed actions), whether the request is AJAX, and the query string
//! (to find the request path).

use crate::config::AppConfig;
use http::Method;

/// Value of `X-Requested-With` that marks an AJAX request.
pub const AJAX_HEADER_VALUE: &str = "XMLHttpRequest";

/// The parts of an inbound request the router consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    method: Method,
    is_ajax: bool,
    query: Vec<(String, String)>,
}

impl Default for RequestInfo {
    fn default() -> Self {
        Self::internal()
    }
}

impl RequestInfo {
    /// Request with `method`, no query, not AJAX.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            is_ajax: false,
            query: Vec::new(),
        }
    }

    /// Request used for calls that do not come from HTTP (CLI, lifecycle hooks).
    #[must_use]
    pub fn internal() -> Self {
        Self::new(Method::GET)
    }

    /// Build from a method, a raw query string and the `X-Requested-With` header.
    #[must_use]
    pub fn from_parts(method: Method, query_string: &str, requested_with: Option<&str>) -> Self {
        Self {
            method,
            is_ajax: requested_with.is_some_and(|v| v.eq_ignore_ascii_case(AJAX_HEADER_VALUE)),
            query: url::form_urlencoded::parse(query_string.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// Mark the request as AJAX (or not).
    #[must_use]
    pub fn with_ajax(mut self, is_ajax: bool) -> Self {
        self.is_ajax = is_ajax;
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Whether the request was made asynchronously.
    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.is_ajax
    }

    /// First value of query parameter `name`.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query parameters in request order.
    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// The request path to route.
    ///
    /// By default this is the `uri_param` query value. In query-string mode
    /// the path is `module[/controller][/action]` followed by the values of
    /// every other query parameter, in order; it is empty when no module is
    /// given.
    #[must_use]
    pub fn route_path(&self, config: &AppConfig) -> String {
        if !config.enable_query_strings {
            return self.query(&config.uri_param).unwrap_or_default().to_string();
        }

        let module = match self.query(&config.module_param) {
            Some(m) if !m.is_empty() => m,
            _ => return String::new(),
        };

        let mut path = module.to_string();
        for param in [&config.controller_param, &config.action_param] {
            if let Some(v) = self.query(param).filter(|v| !v.is_empty()) {
                path.push('/');
                path.push_str(v);
            }
        }
        for (name, value) in &self.query {
            if name == &config.module_param
                || name == &config.controller_param
                || name == &config.action_param
            {
                continue;
            }
            path.push('/');
            path.push_str(value);
        }
        path
    }
}
