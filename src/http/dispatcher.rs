//! Per-request driver.
//!
//! # Flow
//! ```text
//! Request<Body>
//!     → Router::find_route          (none → 404)
//!     → parse_params                (coercion failure → 400)
//!     → parse_cookies
//!     → parse_query                 (coercion failure → 400)
//!     → parse_body, non-GET only    (failure → 400, oversize → 413)
//!     → CompiledRoute::execute
//!     → Response
//! ```
//!
//! Exactly one response leaves `dispatch` per request.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;

use crate::config::EspressoConfig;
use crate::context::{BodyError, BodyParsers, Context, CookiePolicy};
use crate::http::request::request_id;
use crate::observability::metrics;
use crate::routing::{CoercionError, CompiledRoute, Router};

/// Why a request was refused before its handlers ran.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    Body(#[from] BodyError),
}

impl DispatchError {
    fn status(&self) -> StatusCode {
        match self {
            DispatchError::Body(BodyError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            DispatchError::Body(BodyError::TooLarge { .. }) => "Payload Too Large",
            _ => "Error In Parsing",
        }
    }
}

/// Resolves routes, runs the parsing pipeline and the handler chain.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    body_parsers: Arc<BodyParsers>,
    max_body_bytes: usize,
    cookie_policy: CookiePolicy,
}

impl Dispatcher {
    /// Create a dispatcher with default limits and cookie policy.
    pub fn new(router: Arc<Router>) -> Self {
        Self::from_config(router, &EspressoConfig::default())
    }

    /// Create a dispatcher using the server and cookie sections of `config`.
    pub fn from_config(router: Arc<Router>, config: &EspressoConfig) -> Self {
        Self {
            router,
            body_parsers: Arc::new(BodyParsers::default()),
            max_body_bytes: config.server.max_body_bytes,
            cookie_policy: config.cookies.clone(),
        }
    }

    /// Replace the body parser registry.
    pub fn with_body_parsers(mut self, parsers: BodyParsers) -> Self {
        self.body_parsers = Arc::new(parsers);
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Handle one request end to end.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request_id(request.headers()).to_string();
        let method = request.method().clone();
        let target = request.uri().to_string();

        let mut ctx = Context::new(request).with_cookie_policy(self.cookie_policy.clone());

        let Some(route) = self.router.find_route(&method, ctx.path()) else {
            tracing::warn!(request_id = %request_id, method = %method, path = %target, "No route matched");
            ctx.error(format!("No Route For: {}", target), StatusCode::NOT_FOUND);
            return self.finish(ctx, &method, "none", start);
        };

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %target,
            route = %route.path(),
            "Dispatching request"
        );

        let parse_start = Instant::now();
        let parsed = self.parse_request(&route, &mut ctx).await;
        tracing::trace!(
            request_id = %request_id,
            elapsed_us = parse_start.elapsed().as_micros() as u64,
            "Request parsed"
        );

        match parsed {
            Ok(()) => route.execute(&mut ctx).await,
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    route = %route.path(),
                    error = %e,
                    "Rejecting unparsable request"
                );
                ctx.error(e.message(), e.status());
            }
        }

        self.finish(ctx, &method, route.path(), start)
    }

    async fn parse_request(&self, route: &CompiledRoute, ctx: &mut Context) -> Result<(), DispatchError> {
        ctx.parse_params(route)?;
        ctx.parse_cookies();
        ctx.parse_query(route)?;
        if ctx.method() != Method::GET {
            ctx.parse_body(&self.body_parsers, self.max_body_bytes).await?;
        }
        Ok(())
    }

    fn finish(&self, ctx: Context, method: &Method, route: &str, start: Instant) -> Response {
        let response = ctx.into_response();
        let status = response.status();

        metrics::record_request(method.as_str(), route, status.as_u16(), start);
        tracing::debug!(
            method = %method,
            route = %route,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, Reply};
    use crate::routing::{Coercion, Route};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn send(dispatcher: &Dispatcher, request: Request<Body>) -> (StatusCode, String) {
        let response = dispatcher.dispatch(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn echo_name(ctx: &mut Context) -> HandlerResult {
        Ok(Reply::json(json!({ "name": ctx.params["name"] })))
    }

    #[tokio::test]
    async fn test_not_found() {
        let dispatcher = Dispatcher::new(Arc::new(Router::new()));
        let (status, body) = send(
            &dispatcher,
            Request::builder().uri("/missing?x=1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "No Route For: /missing?x=1");
    }

    #[tokio::test]
    async fn test_params_reach_handler() {
        let router = Router::from_routes([Route::get("/subscribers/:name")
            .param("name", Coercion::String)
            .handler_fn(echo_name)])
        .unwrap();
        let dispatcher = Dispatcher::new(Arc::new(router));

        let (status, body) = send(
            &dispatcher,
            Request::builder().uri("/subscribers/alice").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"name":"alice"}"#);
    }

    #[tokio::test]
    async fn test_bad_param_is_400_and_skips_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::from_routes([Route::get("/items/:id")
            .param("id", Coercion::Number)
            .handler_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Reply::next())
            })])
        .unwrap();
        let dispatcher = Dispatcher::new(Arc::new(router));

        let (status, body) = send(
            &dispatcher,
            Request::builder().uri("/items/abc").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error In Parsing");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_body_content_negotiation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::from_routes([Route::post("/subscribe").handler_fn(move |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::json(json!({ "email": ctx.body["email"] })).status(StatusCode::CREATED))
        })])
        .unwrap();
        let dispatcher = Dispatcher::new(Arc::new(router));

        let post = |content_type: &str| {
            Request::builder()
                .method("POST")
                .uri("/subscribe")
                .header("content-type", content_type)
                .body(Body::from(r#"{"email":"a@b.com"}"#))
                .unwrap()
        };

        let (status, body) = send(&dispatcher, post("application/json")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, r#"{"email":"a@b.com"}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (status, _) = send(&dispatcher, post("text/plain")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let router = Router::from_routes([Route::put("/blob").handler_fn(|_| Ok(Reply::next()))]).unwrap();
        let mut config = EspressoConfig::default();
        config.server.max_body_bytes = 8;
        let dispatcher = Dispatcher::from_config(Arc::new(router), &config);

        let (status, _) = send(
            &dispatcher,
            Request::builder()
                .method("PUT")
                .uri("/blob")
                .header("content-type", "application/json")
                .header("content-length", "20")
                .body(Body::from(r#"{"data":"0123456"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_get_ignores_body() {
        let router = Router::from_routes([Route::get("/ping").handler_fn(|ctx| {
            Ok(Reply::json(ctx.body.clone()))
        })])
        .unwrap();
        let dispatcher = Dispatcher::new(Arc::new(router));

        let (status, body) = send(
            &dispatcher,
            Request::builder()
                .uri("/ping")
                .header("content-type", "text/plain")
                .body(Body::from("ignored"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "{}");
    }

    #[tokio::test]
    async fn test_delete_without_body() {
        let router = Router::from_routes([Route::delete("/items/:id").handler_fn(|_| {
            Ok(Reply::text("gone"))
        })])
        .unwrap();
        let dispatcher = Dispatcher::new(Arc::new(router));

        let (status, body) = send(
            &dispatcher,
            Request::builder().method("DELETE").uri("/items/1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "gone"));
    }
}
