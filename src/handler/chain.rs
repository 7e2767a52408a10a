//! Sequential handler-chain execution.
//!
//! # Protocol
//! - Handlers run strictly in order, each awaited before the next starts
//! - A closed response stops the chain with no further writes
//! - A `Rejection` stops the chain and is written as the response
//! - Otherwise the last status and the last declared payload are emitted
//! - A panicking handler is answered with 500

use axum::http::StatusCode;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::context::Context;
use crate::handler::{Handler, Payload};

/// Run `handlers` against `ctx`, producing exactly one response.
pub async fn execute(handlers: &[Arc<dyn Handler>], ctx: &mut Context) {
    let mut status = StatusCode::OK;
    let mut payload: Option<Payload> = None;

    for (position, handler) in handlers.iter().enumerate() {
        if ctx.is_closed() {
            tracing::trace!(position, "Response closed by handler, chain stopped");
            return;
        }

        // `call` itself may panic before returning its future, so it runs inside the guard.
        let outcome = AssertUnwindSafe(async { handler.call(ctx).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(reply)) => {
                status = reply.status.unwrap_or(StatusCode::OK);
                if let Some(declared) = reply.payload {
                    payload = Some(declared);
                }
            }
            Ok(Err(rejection)) => {
                tracing::debug!(
                    position,
                    code = %rejection.code,
                    message = %rejection.message,
                    "Handler rejected request"
                );
                ctx.reject(&rejection);
                return;
            }
            Err(panic) => {
                tracing::error!(
                    position,
                    path = %ctx.path(),
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                ctx.error("Internal Server Error", StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
        }
    }

    if ctx.is_closed() {
        return;
    }

    match payload {
        Some(Payload::Text(text)) => ctx.text(text, status),
        Some(Payload::Json(value)) => ctx.json(&value, status),
        None => ctx.json(&serde_json::Value::Null, status),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxFuture, HandlerFn, HandlerResult, Rejection, Reply};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> Context {
        Context::new(Request::builder().uri("/chain").body(Body::empty()).unwrap())
    }

    fn sync<F>(f: F) -> Arc<dyn Handler>
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        Arc::new(HandlerFn::new(f))
    }

    async fn finish(ctx: Context) -> (StatusCode, String) {
        let response = ctx.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_rejection_short_circuits() {
        let third_calls = Arc::new(AtomicUsize::new(0));
        let counter = third_calls.clone();

        let handlers = vec![
            sync(|_| Ok(Reply::json(json!({ "step": 1 })))),
            sync(|_| Err(Rejection::new("Must provide a 'name'", StatusCode::BAD_REQUEST))),
            sync(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Reply::next())
            }),
        ];

        let mut c = ctx();
        execute(&handlers, &mut c).await;

        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            finish(c).await,
            (StatusCode::BAD_REQUEST, "Must provide a 'name'".to_string())
        );
    }

    #[tokio::test]
    async fn test_last_payload_and_status_win() {
        let handlers = vec![
            sync(|_| Ok(Reply::json(json!({ "first": true })).status(StatusCode::ACCEPTED))),
            sync(|_| Ok(Reply::json(json!({ "second": true })).status(StatusCode::CREATED))),
            sync(|_| Ok(Reply::next().status(StatusCode::CREATED))),
        ];

        let mut c = ctx();
        execute(&handlers, &mut c).await;
        assert_eq!(
            finish(c).await,
            (StatusCode::CREATED, r#"{"second":true}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_text_payload_and_default_status() {
        let handlers = vec![
            sync(|_| Ok(Reply::text("pong").status(StatusCode::ACCEPTED))),
            sync(|_| Ok(Reply::next())),
        ];

        let mut c = ctx();
        execute(&handlers, &mut c).await;
        assert_eq!(finish(c).await, (StatusCode::OK, "pong".to_string()));
    }

    #[tokio::test]
    async fn test_no_payload_is_empty_object() {
        let handlers = vec![sync(|_| Ok(Reply::next()))];
        let mut c = ctx();
        execute(&handlers, &mut c).await;
        assert_eq!(finish(c).await, (StatusCode::OK, "{}".to_string()));
    }

    #[tokio::test]
    async fn test_data_flows_between_handlers() {
        let handlers = vec![
            sync(|ctx| {
                ctx.data.insert("user".into(), json!({ "uid": "u1" }));
                Ok(Reply::next())
            }),
            sync(|ctx| Ok(Reply::json(json!({ "user": ctx.data["user"] })))),
        ];

        let mut c = ctx();
        execute(&handlers, &mut c).await;
        assert_eq!(
            finish(c).await,
            (StatusCode::OK, r#"{"user":{"uid":"u1"}}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_direct_write_stops_chain() {
        let later = Arc::new(AtomicUsize::new(0));
        let counter = later.clone();

        let handlers = vec![
            sync(|ctx| {
                ctx.text("handled", StatusCode::ACCEPTED);
                Ok(Reply::json(json!({ "ignored": true })))
            }),
            sync(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Reply::next())
            }),
        ];

        let mut c = ctx();
        execute(&handlers, &mut c).await;
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(finish(c).await, (StatusCode::ACCEPTED, "handled".to_string()));
    }

    #[tokio::test]
    async fn test_async_handler() {
        fn later(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
            Box::pin(async move {
                tokio::task::yield_now().await;
                ctx.data.insert("seen".into(), json!(true));
                Ok(Reply::text("later"))
            })
        }
        let handler: Arc<dyn Handler> = Arc::new(later);

        let mut c = ctx();
        execute(&[handler], &mut c).await;
        assert_eq!(c.data["seen"], json!(true));
        assert_eq!(finish(c).await, (StatusCode::OK, "later".to_string()));
    }

    #[tokio::test]
    async fn test_panic_before_future_becomes_500() {
        fn eager(_: &mut Context) -> BoxFuture<'_, HandlerResult> {
            panic!("panicked while building the future")
        }
        let handler: Arc<dyn Handler> = Arc::new(eager);

        let mut c = ctx();
        execute(&[handler], &mut c).await;
        assert_eq!(
            finish(c).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let after = Arc::new(AtomicUsize::new(0));
        let counter = after.clone();

        let handlers = vec![
            sync(|_| panic!("boom")),
            sync(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Reply::next())
            }),
        ];

        let mut c = ctx();
        execute(&handlers, &mut c).await;
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(
            finish(c).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
        );
    }
}
