//! Route definitions and their compiled form.

use axum::http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::handler::{chain, BoxFuture, Handler, HandlerFn, HandlerResult};
use crate::routing::coerce::Coercion;
use crate::routing::matcher::PathMatcher;
use crate::routing::RouteError;

/// Methods a route may be registered for.
pub const SUPPORTED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// A route under construction: method, template, coercion schemas and handler chain.
///
/// ```rust,ignore
/// let route = Route::get("/subscribers/:name")
///     .param("name", Coercion::String)
///     .handler(|ctx| Box::pin(async move { Ok(Reply::json(json!({ "ok": true }))) }));
/// ```
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    param_schema: HashMap<String, Coercion>,
    query_schema: HashMap<String, Coercion>,
    handlers: Vec<Arc<dyn Handler>>,
}

impl Route {
    /// Create a new route for `method` and a path template such as `/users/:id`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            param_schema: HashMap::new(),
            query_schema: HashMap::new(),
            handlers: Vec::new(),
        }
    }

    /// Create a new GET route.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a new POST route.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Create a new PUT route.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Create a new DELETE route.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Declare the coercion for a path parameter.
    pub fn param(mut self, name: impl Into<String>, coercion: Coercion) -> Self {
        self.param_schema.insert(name.into(), coercion);
        self
    }

    /// Declare the coercion for a query key. Undeclared keys stay raw strings.
    pub fn query(mut self, key: impl Into<String>, coercion: Coercion) -> Self {
        self.query_schema.insert(key.into(), coercion);
        self
    }

    /// Append an async closure to the handler chain.
    pub fn handler<F>(self, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.with(f)
    }

    /// Append a synchronous closure to the handler chain.
    pub fn handler_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        self.with(HandlerFn::new(f))
    }

    /// Append any [`Handler`] (typically middleware such as the auth guards).
    pub fn with<H: Handler>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append an already shared handler.
    pub fn with_shared(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Validate the route and compile its template.
    pub fn compile(self) -> Result<CompiledRoute, RouteError> {
        if !SUPPORTED_METHODS.contains(&self.method) {
            return Err(RouteError::UnsupportedMethod(self.method.to_string()));
        }
        if self.handlers.is_empty() {
            return Err(RouteError::EmptyChain {
                method: self.method.to_string(),
                path: self.path,
            });
        }

        let matcher = PathMatcher::compile(&self.path)?;

        if let Some(unknown) = self
            .param_schema
            .keys()
            .find(|name| !matcher.slots().iter().any(|s| &s.name == *name))
        {
            return Err(RouteError::UnknownParam {
                template: self.path.clone(),
                name: unknown.clone(),
            });
        }

        let params = matcher
            .slots()
            .iter()
            .map(|slot| CompiledParam {
                name: slot.name.clone(),
                index: slot.index,
                coercion: self.param_schema.get(&slot.name).copied().unwrap_or_default(),
            })
            .collect();

        Ok(CompiledRoute {
            route: self,
            matcher,
            params,
        })
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("param_schema", &self.param_schema)
            .field("query_schema", &self.query_schema)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// A path parameter with its segment position and coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledParam {
    pub name: String,
    pub index: usize,
    pub coercion: Coercion,
}

/// A registered route. Never mutated after registration.
#[derive(Debug)]
pub struct CompiledRoute {
    route: Route,
    matcher: PathMatcher,
    params: Vec<CompiledParam>,
}

impl CompiledRoute {
    /// Returns true if `path` fits this route's template.
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    pub fn method(&self) -> &Method {
        &self.route.method
    }

    pub fn path(&self) -> &str {
        &self.route.path
    }

    /// Path parameters in template order.
    pub fn params(&self) -> &[CompiledParam] {
        &self.params
    }

    /// Coercion declared for a query key, if any.
    pub fn query_coercion(&self, key: &str) -> Option<Coercion> {
        self.route.query_schema.get(key).copied()
    }

    /// Run this route's handler chain against `ctx`.
    pub async fn execute(&self, ctx: &mut Context) {
        chain::execute(&self.route.handlers, ctx).await
    }
}
