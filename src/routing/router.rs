//! Route registry and lookup.
//!
//! # Responsibilities
//! - Store compiled routes, bucketed by HTTP method
//! - Look up the route for a `(method, path)` pair
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Registration order is preserved within a bucket; first match wins
//! - No specificity ranking between overlapping templates
//! - Guarded by an `RwLock`: registration writes, lookups read
//! - Matched routes are handed out as `Arc` so no lock is held while handlers run

use axum::http::Method;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::routing::route::{CompiledRoute, Route};
use crate::routing::RouteError;

/// Registry of routes keyed by method.
#[derive(Debug, Default)]
pub struct Router {
    buckets: RwLock<HashMap<Method, Vec<Arc<CompiledRoute>>>>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router from a list of routes, failing on the first invalid one.
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Result<Self, RouteError> {
        let router = Self::new();
        router.register_many(routes)?;
        Ok(router)
    }

    /// Compile and append a route to its method bucket.
    pub fn register(&self, route: Route) -> Result<Arc<CompiledRoute>, RouteError> {
        let compiled = Arc::new(route.compile()?);
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        buckets
            .entry(compiled.method().clone())
            .or_default()
            .push(compiled.clone());

        tracing::debug!(
            method = %compiled.method(),
            path = %compiled.path(),
            "Route registered"
        );
        Ok(compiled)
    }

    /// Register routes in order, stopping at the first invalid one.
    pub fn register_many(&self, routes: impl IntoIterator<Item = Route>) -> Result<(), RouteError> {
        for route in routes {
            self.register(route)?;
        }
        Ok(())
    }

    /// Find the first route registered for `method` whose template matches `path`.
    pub fn find_route(&self, method: &Method, path: &str) -> Option<Arc<CompiledRoute>> {
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        buckets
            .get(method)?
            .iter()
            .find(|route| route.matches(path))
            .cloned()
    }

    /// Total number of registered routes.
    pub fn len(&self) -> usize {
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
