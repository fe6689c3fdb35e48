//! Ordered route tables and their persisted form.
//!
//! The persisted form is a JSON object mapping pattern → replacement, where a
//! replacement is a string, a one- or two-element array `[normal, ajax]`, or
//! `null`. Object order is the match order.

use super::core::{ResolvedRoute, Replacement, Route};
use crate::error::RouterError;
use crate::persist::FileLock;
use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Persisted value of one route entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReplacement", into = "RawReplacement")]
pub struct RouteValue(pub Option<Replacement>);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawReplacement {
    Single(String),
    Variants(Vec<String>),
    Disabled(Option<bool>),
}

impl TryFrom<RawReplacement> for RouteValue {
    type Error = String;

    fn try_from(raw: RawReplacement) -> Result<Self, Self::Error> {
        match raw {
            RawReplacement::Single(s) => Ok(RouteValue(Some(Replacement::new(s)))),
            RawReplacement::Variants(v) if v.len() > 2 => {
                Err("a route replacement holds at most two targets".to_string())
            }
            RawReplacement::Variants(v) => {
                let mut it = v.into_iter();
                let normal = it.next();
                Ok(RouteValue(normal.map(|normal| Replacement {
                    normal,
                    ajax: it.next(),
                })))
            }
            RawReplacement::Disabled(Some(true)) => {
                Err("`true` is not a valid route replacement".to_string())
            }
            RawReplacement::Disabled(_) => Ok(RouteValue(None)),
        }
    }
}

impl From<RouteValue> for RawReplacement {
    fn from(value: RouteValue) -> Self {
        match value.0 {
            None => RawReplacement::Disabled(None),
            Some(Replacement { normal, ajax: None }) => RawReplacement::Single(normal),
            Some(Replacement {
                normal,
                ajax: Some(ajax),
            }) => RawReplacement::Variants(vec![normal, ajax]),
        }
    }
}

/// Persisted mapping `pattern → replacement`, in match order.
pub type RouteFile = IndexMap<String, RouteValue>;

/// Ordered collection of compiled routes keyed by source pattern.
///
/// Lookup returns the first route, in insertion order, whose pattern matches.
/// Adding a route under an existing key replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct RouteCollection {
    routes: IndexMap<String, Route>,
}

impl RouteCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. A route with the same source pattern is replaced and keeps
    /// its position.
    pub fn add(&mut self, route: Route) {
        let key = route.source().to_string();
        if self.routes.insert(key, route).is_some() {
            debug!("Replaced existing route definition");
        }
    }

    /// Compile and add a route.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] for an invalid pattern.
    pub fn add_pattern(
        &mut self,
        pattern: &str,
        replacement: Option<Replacement>,
    ) -> Result<(), RouterError> {
        self.add(Route::new(pattern, replacement)?);
        Ok(())
    }

    /// Remove the route stored under `key`, preserving the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<Route> {
        self.routes.shift_remove(key)
    }

    /// Merge `other` into this collection; its routes win on key conflicts.
    pub fn merge(&mut self, other: RouteCollection) {
        for (_, route) in other.routes {
            self.add(route);
        }
    }

    /// First matching route's dispatch data.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<ResolvedRoute> {
        self.routes.values().find_map(|route| route.resolve(path))
    }

    /// Route stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Route> {
        self.routes.get(key)
    }

    /// Whether a route is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.routes.contains_key(key)
    }

    /// Routes in match order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Build from a persisted mapping.
    ///
    /// Entries whose pattern does not compile never match; they are skipped
    /// with a warning and dropped on the next write.
    #[must_use]
    pub fn from_route_file(file: RouteFile) -> Self {
        let mut collection = Self::new();
        for (pattern, RouteValue(replacement)) in file {
            match Route::new(&pattern, replacement) {
                Ok(route) => collection.add(route),
                Err(e) => warn!(pattern = %pattern, error = %e, "Skipping invalid route pattern"),
            }
        }
        collection
    }

    /// The persisted mapping for this collection.
    #[must_use]
    pub fn to_route_file(&self) -> RouteFile {
        self.routes
            .iter()
            .map(|(key, route)| (key.clone(), RouteValue(route.replacement().cloned())))
            .collect()
    }

    /// Serialize to the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn serialize(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(&self.to_route_file()).context("failed to serialize routes")
    }

    /// Parse the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Fails when the text is not a route mapping.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let file: RouteFile = serde_json::from_str(text).context("route file is not a route mapping")?;
        Ok(Self::from_route_file(file))
    }

    /// Load a route file.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::RouteFile`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, RouterError> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
            .map_err(|source| RouterError::RouteFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&text).map_err(|source| RouterError::RouteFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rewrite `path` with this collection (whole-file replace).
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::RouteFile`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), RouterError> {
        let lock = FileLock::acquire(path).map_err(|source| RouterError::RouteFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.save_locked(&lock)
    }

    /// Rewrite the file held by `lock`.
    pub(crate) fn save_locked(&self, lock: &FileLock) -> Result<(), RouterError> {
        let path = lock.target();
        let to_route_file_error = |source| RouterError::RouteFile {
            path: path.to_path_buf(),
            source,
        };
        let mut text = self.serialize().map_err(to_route_file_error)?;
        text.push('\n');
        lock.replace(text.as_bytes()).map_err(to_route_file_error)?;
        info!(
            routes_file = %path.display(),
            routes_count = self.len(),
            "Route file written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(entries: &[(&str, Option<Replacement>)]) -> RouteCollection {
        let mut rc = RouteCollection::new();
        for (pattern, replacement) in entries {
            rc.add_pattern(pattern, replacement.clone()).unwrap();
        }
        rc
    }

    #[test]
    fn test_first_match_wins() {
        let rc = collection(&[
            ("news/:num", Some(Replacement::new("news/article/view/$0"))),
            ("news/:any", Some(Replacement::new("news/archive"))),
        ]);
        let data = rc.lookup("news/5").unwrap();
        assert_eq!(data.controller, "Article");

        let data = rc.lookup("news/latest").unwrap();
        assert_eq!(data.controller, "Archive");
        assert!(rc.lookup("forum").is_none());
    }

    #[test]
    fn test_add_replaces_in_place() {
        let mut rc = collection(&[
            ("a", Some(Replacement::new("one"))),
            ("b", Some(Replacement::new("two"))),
        ]);
        rc.add_pattern("a", Some(Replacement::new("three"))).unwrap();
        assert_eq!(rc.len(), 2);
        let keys: Vec<&str> = rc.iter().map(Route::source).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(rc.lookup("a").unwrap().module, "three");
    }

    #[test]
    fn test_merge_does_not_duplicate_keys() {
        let mut rc = collection(&[("a", Some(Replacement::new("one")))]);
        let other = collection(&[
            ("a", Some(Replacement::new("two"))),
            ("c", Some(Replacement::new("four"))),
        ]);
        rc.merge(other);
        assert_eq!(rc.len(), 2);
        assert_eq!(rc.lookup("a").unwrap().module, "two");
        assert!(rc.contains("c"));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut rc = collection(&[("a", None), ("b", None), ("c", None)]);
        assert!(rc.remove("b").is_some());
        assert!(rc.remove("missing").is_none());
        let keys: Vec<&str> = rc.iter().map(Route::source).collect();
        assert_eq!(keys, ["a", "c"]);
    }

    #[test]
    fn test_serialized_form() {
        let rc = collection(&[
            ("news/(:num)", Some(Replacement::with_ajax("article/$1", "ajax/article/$1"))),
            ("home", Some(Replacement::new("news"))),
            ("raw/:any", None),
        ]);
        let value: serde_json::Value = serde_json::from_str(&rc.serialize().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "news/(:num)": ["article/$1", "ajax/article/$1"],
                "home": "news",
                "raw/:any": null
            })
        );
    }

    #[test]
    fn test_parse_preserves_order_and_behavior() {
        let text = r#"{
            "zeta/:any": "one",
            "alpha/:any": ["two"],
            ":any": ["three", "four"],
            "off": false
        }"#;
        let rc = RouteCollection::parse(text).unwrap();
        let keys: Vec<&str> = rc.iter().map(Route::source).collect();
        assert_eq!(keys, ["zeta/:any", "alpha/:any", ":any", "off"]);
        assert_eq!(rc.lookup("alpha/x").unwrap().module, "two");
        assert!(rc.get("off").unwrap().replacement().is_none());

        let reparsed = RouteCollection::parse(&rc.serialize().unwrap()).unwrap();
        for path in ["zeta/1", "alpha/x", "other", "off"] {
            assert_eq!(rc.lookup(path), reparsed.lookup(path), "path {path}");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_files() {
        assert!(RouteCollection::parse("[1, 2]").is_err());
        assert!(RouteCollection::parse(r#"{"a": ["1", "2", "3"]}"#).is_err());
    }

    #[test]
    fn test_parse_skips_uncompilable_patterns() {
        let rc = RouteCollection::parse(r#"{"(?=x)y": "news", "(": "x", "home": "news"}"#).unwrap();
        let keys: Vec<&str> = rc.iter().map(Route::source).collect();
        assert_eq!(keys, ["home"]);
        assert_eq!(rc.lookup("home").unwrap().module, "news");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        let rc = collection(&[("home", Some(Replacement::new("news")))]);
        rc.save(&path).unwrap();

        let loaded = RouteCollection::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.lookup("home").unwrap().module, "news");

        let missing = RouteCollection::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, RouterError::RouteFile { .. }));
    }
}
