//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup via [`matchit`]. The
//! router only maps method + path to a route; building the controller
//! behind the route happens per request in the route itself.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::{Error, Result};
use crate::handler::{Handler, SharedRoute};
use crate::method::Method;

/// Result of routing one request.
pub(crate) enum Lookup {
    Found(SharedRoute, HashMap<String, String>),
    /// The path exists under these other methods.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// The application router.
///
/// Built once at start-up by [`App`](crate::App). Path parameters use
/// `{name}` syntax.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<SharedRoute>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a closure for a method + path pair. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an existing route;
    /// code-defined routes are a programming error, not a runtime condition.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.insert(&[method], path, handler.into_route())
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Register a shared route under every method in `methods`.
    ///
    /// Config-driven routes go through here so a bad path surfaces as
    /// [`Error::InvalidConfiguration`].
    pub fn insert(&mut self, methods: &[Method], path: &str, route: SharedRoute) -> Result<()> {
        for method in methods {
            self.routes
                .entry(*method)
                .or_default()
                .insert(path, Arc::clone(&route))
                .map_err(|e| {
                    Error::invalid_configuration(format!("invalid route `{method} {path}`: {e}"))
                })?;
        }
        Ok(())
    }

    /// Methods registered for `path`, sorted.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .routes
            .iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| *method)
            .collect();
        methods.sort_unstable();
        methods
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Lookup {
        let matched = self.routes.get(&method).and_then(|tree| tree.at(path).ok());
        match matched {
            Some(matched) => {
                let params = matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                Lookup::Found(Arc::clone(matched.value), params)
            }
            None => {
                let allowed = self.allowed_methods(path);
                if allowed.is_empty() {
                    Lookup::NotFound
                } else {
                    Lookup::MethodNotAllowed(allowed)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    fn router() -> Router {
        Router::new()
            .on(Method::Get, "/posts/{slug}", |req: &Request| {
                req.param("slug").unwrap_or("").to_owned()
            })
            .on(Method::Delete, "/posts/{slug}", |_: &Request| "deleted")
    }

    #[test]
    fn found_route_carries_params() {
        match router().lookup(Method::Get, "/posts/hello") {
            Lookup::Found(_, params) => assert_eq!(params["slug"], "hello"),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn other_methods_are_reported() {
        match router().lookup(Method::Post, "/posts/hello") {
            Lookup::MethodNotAllowed(allowed) => assert_eq!(allowed, [Method::Delete, Method::Get]),
            _ => panic!("expected method not allowed"),
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert!(matches!(router().lookup(Method::Get, "/nope"), Lookup::NotFound));
    }

    #[test]
    fn conflicting_insert_is_invalid_configuration() {
        let mut router = router();
        let route = (|_: &Request| "again").into_route();
        let err = router.insert(&[Method::Get], "/posts/{slug}", route).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }
}
