//! Terminal error pages.
//!
//! `error/404`, `error/403` and `error/offline` are last-resort responses.
//! Rendering them cannot fail and never dispatches anything.

use serde_json::json;
use std::fmt;

/// The fixed error routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorRoute {
    /// `error/404`
    NotFound,
    /// `error/403`
    Forbidden,
    /// `error/offline`
    Offline,
}

impl ErrorRoute {
    /// All error routes.
    pub const ALL: [ErrorRoute; 3] = [ErrorRoute::NotFound, ErrorRoute::Forbidden, ErrorRoute::Offline];

    /// Normalized request path of the route.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            ErrorRoute::NotFound => "error/404",
            ErrorRoute::Forbidden => "error/403",
            ErrorRoute::Offline => "error/offline",
        }
    }

    /// The error route addressed by a normalized path, if any.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    /// HTTP status served with the page.
    #[must_use]
    pub fn status(self) -> u16 {
        match self {
            ErrorRoute::NotFound => 404,
            ErrorRoute::Forbidden => 403,
            ErrorRoute::Offline => 503,
        }
    }

    fn message(self, is_ajax: bool) -> &'static str {
        match (self, is_ajax) {
            (ErrorRoute::Offline, true) => "Site Currently Offline",
            (ErrorRoute::Offline, false) => "Site Down For Maintenance",
            (route, _) => status_reason(route.status()),
        }
    }
}

impl fmt::Display for ErrorRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

fn status_reason(status: u16) -> &'static str {
    match status {
        403 => "Forbidden",
        404 => "Not Found",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

/// A rendered terminal page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    /// Route that produced the page
    pub route: ErrorRoute,
    /// HTTP status
    pub status: u16,
    /// `text/html; charset=utf-8` or `application/json`
    pub content_type: &'static str,
    /// Response body
    pub body: String,
}

impl ErrorPage {
    /// Render `route` as HTML, or as a JSON body for AJAX requests.
    #[must_use]
    pub fn render(route: ErrorRoute, is_ajax: bool) -> Self {
        let status = route.status();
        let message = route.message(is_ajax);
        let (content_type, body) = if is_ajax {
            ("application/json", json!({ "message": message }).to_string())
        } else {
            (
                "text/html; charset=utf-8",
                format!(
                    "<!DOCTYPE html>\n<html>\n<head><title>{status} {message}</title></head>\n\
                     <body>\n<h1>{message}</h1>\n</body>\n</html>\n"
                ),
            )
        };
        Self {
            route,
            status,
            content_type,
            body,
        }
    }

    /// Status line text, e.g. `503 Service Unavailable`.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!("{} {}", self.status, status_reason(self.status))
    }
}
