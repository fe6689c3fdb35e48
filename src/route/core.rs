//! Route pattern compilation and matching.
//!
//! A route pattern is a regular expression that may contain the shorthand
//! tokens `:any`, `:alnum`, `:num`, `:alpha` and `:segment`. Tokens are
//! expanded once, at construction, and the result is anchored at both ends
//! and matched case-insensitively against the normalized request path.

use crate::error::RouterError;
use regex::Regex;
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of positional parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Positional action parameters. Stack-allocated for ≤8 params.
pub type ParamVec = SmallVec<[String; MAX_INLINE_PARAMS]>;

/// Action used when a path does not name one.
pub const DEFAULT_ACTION: &str = "index";

/// Token expansions, applied in this order.
const TOKENS: [(&str, &str); 5] = [
    (":any", ".*"),
    (":alnum", "[[:alnum:]]+"),
    (":num", "[[:digit:]]+"),
    (":alpha", "[[:alpha:]]+"),
    (":segment", "[^/]*"),
];

/// Expand the shorthand tokens of a route pattern into regex syntax.
#[must_use]
pub fn expand_tokens(pattern: &str) -> String {
    TOKENS
        .iter()
        .fold(pattern.to_string(), |acc, (token, expansion)| {
            acc.replace(token, expansion)
        })
}

/// Upper-case the first character of `s`, leaving the rest untouched.
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rewrite a replacement template into `regex` expansion syntax.
///
/// Templates use `$1`, `${1}` or `\1` group references (at most two digits
/// for the unbraced forms). A `$` that does not start a reference is kept
/// literally.
fn to_regex_template(template: &str) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len() + 8);
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if (c == b'$' || c == b'\\') && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let mut end = i + 2;
            if end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            out.push_str("${");
            out.push_str(&template[i + 1..end]);
            out.push('}');
            i = end;
            continue;
        }
        if c == b'$' && template[i + 1..].starts_with('{') {
            if let Some(close) = template[i + 2..].find('}') {
                let inner = &template[i + 2..i + 2 + close];
                if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
                    out.push_str(&template[i..i + 3 + close]);
                    i += 3 + close;
                    continue;
                }
            }
        }
        if c == b'$' {
            out.push_str("$$");
            i += 1;
            continue;
        }
        // Multi-byte characters are copied whole.
        let ch_len = template[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&template[i..i + ch_len]);
        i += ch_len;
    }
    out
}

/// Rewrite target(s) for a matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Template producing the normal target path
    pub normal: String,
    /// Template producing the AJAX target path, if any
    pub ajax: Option<String>,
}

impl Replacement {
    /// A single rewrite template.
    pub fn new(normal: impl Into<String>) -> Self {
        Self {
            normal: normal.into(),
            ajax: None,
        }
    }

    /// A normal template plus an AJAX variant.
    pub fn with_ajax(normal: impl Into<String>, ajax: impl Into<String>) -> Self {
        Self {
            normal: normal.into(),
            ajax: Some(ajax.into()),
        }
    }
}

/// Module / controller / action / params addressed by a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// Module name (first segment)
    pub module: String,
    /// Controller name, first letter capitalized
    pub controller: String,
    /// Action name
    pub action: String,
    /// Remaining positional segments
    pub params: ParamVec,
}

impl RouteTarget {
    /// Split a target path into its parts.
    ///
    /// Trailing slashes are trimmed. The controller defaults to the
    /// capitalized module name and the action to `index`.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let mut parts = path.trim_end_matches('/').split('/');
        let module = parts.next().unwrap_or_default().to_string();
        let controller = parts
            .next()
            .map_or_else(|| capitalize(&module), capitalize);
        let action = parts.next().unwrap_or(DEFAULT_ACTION).to_string();
        let params = parts.map(str::to_string).collect();
        Self {
            module,
            controller,
            action,
            params,
        }
    }
}

/// Dispatch data produced by a route match or by positional parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    /// Module name
    pub module: String,
    /// Controller name
    pub controller: String,
    /// Action name
    pub action: String,
    /// Positional parameters
    pub params: ParamVec,
    /// Alternate target used for AJAX requests
    pub ajax: Option<RouteTarget>,
}

impl ResolvedRoute {
    /// Positional resolution of `path`, with no AJAX variant.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        Self::from_target(RouteTarget::from_path(path), None)
    }

    /// Build from a normal target and an optional AJAX target.
    #[must_use]
    pub fn from_target(target: RouteTarget, ajax: Option<RouteTarget>) -> Self {
        Self {
            module: target.module,
            controller: target.controller,
            action: target.action,
            params: target.params,
            ajax,
        }
    }

    /// Controller and action to dispatch for the given request kind.
    ///
    /// AJAX requests use the AJAX variant when one exists. Parameters always
    /// come from the normal target.
    #[must_use]
    pub fn select(&self, is_ajax: bool) -> (&str, &str) {
        match (&self.ajax, is_ajax) {
            (Some(ajax), true) => (ajax.controller.as_str(), ajax.action.as_str()),
            _ => (self.controller.as_str(), self.action.as_str()),
        }
    }
}

/// A compiled route pattern.
#[derive(Clone)]
pub struct Route {
    /// Pattern as written, used as the route's key
    source: String,
    /// Anchored, case-insensitive matcher
    regex: Regex,
    /// Rewrite target(s)
    replacement: Option<Replacement>,
    /// `replacement` converted into regex expansion syntax
    templates: Option<(String, Option<String>)>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("source", &self.source)
            .field("replacement", &self.replacement)
            .finish()
    }
}

impl Route {
    /// Compile a route pattern.
    ///
    /// An empty normal template is the same as no replacement.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] if the expanded pattern is not
    /// a valid regular expression.
    pub fn new(pattern: &str, replacement: Option<Replacement>) -> Result<Self, RouterError> {
        let expanded = expand_tokens(pattern);
        let regex = Regex::new(&format!("(?i)^(?:{expanded})$")).map_err(|source| {
            RouterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        let replacement = replacement.filter(|r| !r.normal.is_empty());
        let templates = replacement.as_ref().map(|r| {
            (
                to_regex_template(&r.normal),
                r.ajax.as_deref().map(to_regex_template),
            )
        });

        Ok(Self {
            source: pattern.to_string(),
            regex,
            replacement,
            templates,
        })
    }

    /// Pattern as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Rewrite target(s), if any.
    #[must_use]
    pub fn replacement(&self) -> Option<&Replacement> {
        self.replacement.as_ref()
    }

    /// Whether `path` matches this pattern.
    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and produce dispatch data.
    ///
    /// The AJAX path is produced by applying the AJAX template to the
    /// already-rewritten normal path, not to `path`. When the rewritten path
    /// no longer matches the pattern the AJAX path equals the normal path.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        if !self.regex.is_match(path) {
            return None;
        }

        let (normal, ajax) = match &self.templates {
            Some((normal_tpl, ajax_tpl)) => {
                let normal = self.regex.replace(path, normal_tpl.as_str()).into_owned();
                let ajax = ajax_tpl
                    .as_deref()
                    .map(|tpl| self.regex.replace(&normal, tpl).into_owned());
                (normal, ajax)
            }
            None => (path.to_string(), None),
        };

        Some(ResolvedRoute::from_target(
            RouteTarget::from_path(&normal),
            ajax.as_deref().map(RouteTarget::from_path),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(pattern: &str, replacement: Option<Replacement>) -> Route {
        Route::new(pattern, replacement).unwrap()
    }

    #[test]
    fn test_token_expansion() {
        assert_eq!(expand_tokens("news/:num"), "news/[[:digit:]]+");
        assert_eq!(expand_tokens(":any"), ".*");
        assert_eq!(expand_tokens("u/:alnum/:alpha"), "u/[[:alnum:]]+/[[:alpha:]]+");
        assert_eq!(expand_tokens("p/:segment/x"), "p/[^/]*/x");
    }

    #[test]
    fn test_tokens_match_their_classes() {
        let r = route("news/:num", None);
        assert!(r.is_match("news/42"));
        assert!(!r.is_match("news/4a"));
        assert!(!r.is_match("news/"));

        let r = route("tag/:alpha", None);
        assert!(r.is_match("tag/rust"));
        assert!(!r.is_match("tag/r2"));

        let r = route("user/:alnum", None);
        assert!(r.is_match("user/bob42"));
        assert!(!r.is_match("user/bob-42"));

        let r = route("a/:segment/c", None);
        assert!(r.is_match("a/b/c"));
        assert!(r.is_match("a//c"));
        assert!(!r.is_match("a/b/x/c"));

        let r = route("files/:any", None);
        assert!(r.is_match("files/a/b/c"));
        assert!(r.is_match("files/"));
    }

    #[test]
    fn test_anchored_and_case_insensitive() {
        let r = route("news/:num", None);
        assert!(r.is_match("NEWS/7"));
        assert!(!r.is_match("old/news/7"));
        assert!(!r.is_match("news/7/comments"));

        // Alternation stays inside the anchors.
        let r = route("a|b", None);
        assert!(r.is_match("a"));
        assert!(!r.is_match("ab"));
    }

    #[test]
    fn test_resolve_without_replacement_uses_path() {
        let r = route("admin/:any", None);
        let data = r.resolve("admin/users/edit/7").unwrap();
        assert_eq!(data.module, "admin");
        assert_eq!(data.controller, "Users");
        assert_eq!(data.action, "edit");
        assert_eq!(data.params.as_slice(), ["7".to_string()]);
        assert!(data.ajax.is_none());
    }

    #[test]
    fn test_resolve_with_replacement() {
        let r = route("blog/(:num)", Some(Replacement::new("news/article/view/$1")));
        let data = r.resolve("blog/12").unwrap();
        assert_eq!(data.module, "news");
        assert_eq!(data.controller, "Article");
        assert_eq!(data.action, "view");
        assert_eq!(data.params.as_slice(), ["12".to_string()]);
    }

    #[test]
    fn test_defaults_for_short_targets() {
        let r = route("home", Some(Replacement::new("news/")));
        let data = r.resolve("home").unwrap();
        assert_eq!(data.module, "news");
        assert_eq!(data.controller, "News");
        assert_eq!(data.action, "index");
        assert!(data.params.is_empty());
    }

    #[test]
    fn test_ajax_variant_is_derived_from_rewritten_path() {
        // The rewritten path `article/42` no longer matches `news/(:num)`, so
        // the AJAX template has nothing to substitute.
        let r = route(
            "news/(:num)",
            Some(Replacement::with_ajax("article/$1", "ajax/article/$1")),
        );
        let data = r.resolve("news/42").unwrap();
        assert_eq!(data.module, "article");
        assert_eq!(data.controller, "42");
        let ajax = data.ajax.unwrap();
        assert_eq!(ajax.module, "article");
        assert_eq!(ajax.controller, "42");
    }

    #[test]
    fn test_ajax_variant_substitutes_rewritten_groups() {
        // `(:any)` still matches the rewritten path, so the AJAX template sees
        // the rewritten text, not the request path.
        let r = route(
            "(:any)",
            Some(Replacement::with_ajax("shop/cart/$1", "shop/ajax/$1")),
        );
        let data = r.resolve("checkout").unwrap();
        assert_eq!(data.controller, "Cart");
        assert_eq!(data.action, "checkout");
        let ajax = data.ajax.unwrap();
        assert_eq!(ajax.controller, "Ajax");
        assert_eq!(ajax.action, "shop");
        assert_eq!(ajax.params.as_slice(), ["cart".to_string(), "checkout".to_string()]);
    }

    #[test]
    fn test_select_prefers_ajax_only_for_ajax_requests() {
        let r = route(
            "(:any)",
            Some(Replacement::with_ajax("shop/cart/$1", "shop/ajax/$1")),
        );
        let data = r.resolve("checkout").unwrap();
        assert_eq!(data.select(false), ("Cart", "checkout"));
        assert_eq!(data.select(true), ("Ajax", "shop"));
    }

    #[test]
    fn test_template_conversion() {
        assert_eq!(to_regex_template("a/$1b"), "a/${1}b");
        assert_eq!(to_regex_template("a/\\2"), "a/${2}");
        assert_eq!(to_regex_template("a/${3}"), "a/${3}");
        assert_eq!(to_regex_template("cost$"), "cost$$");
        assert_eq!(to_regex_template("$12x"), "${12}x");
        assert_eq!(to_regex_template("é/$1"), "é/${1}");
    }

    #[test]
    fn test_empty_replacement_is_passthrough() {
        let r = route("news/:num", Some(Replacement::new("")));
        assert!(r.replacement().is_none());
        assert_eq!(r.resolve("news/3").unwrap().controller, "3");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = Route::new("news/(:num", None).unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern { .. }));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("users"), "Users");
        assert_eq!(capitalize("Users"), "Users");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("404"), "404");
    }
}
