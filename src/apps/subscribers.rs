//! Subscriber list routes.
//!
//! | Route                     | Behaviour                                       |
//! |---------------------------|-------------------------------------------------|
//! | `GET /ping`               | liveness message                                |
//! | `POST /subscribe`         | add `body.name` (lowercased), 201 with its index |
//! | `GET /subscribers/:name`  | `{ "n": count }` of matching names              |
//! | `GET /subscribers-list`   | sorted names, `?limit=<number>&order=asc|desc`  |

use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::context::Context;
use crate::handler::{HandlerResult, Rejection, Reply};
use crate::routing::{Coercion, ParamValue, Route};

/// Names subscribed so far, in arrival order.
#[derive(Debug, Default)]
pub struct SubscriberList {
    names: RwLock<Vec<String>>,
}

impl SubscriberList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name, returning its position.
    pub fn subscribe(&self, name: &str) -> usize {
        let mut names = self.write();
        names.push(name.to_lowercase());
        names.len() - 1
    }

    /// How many times `name` subscribed, ignoring case.
    pub fn count(&self, name: &str) -> usize {
        let name = name.to_lowercase();
        self.read().iter().filter(|n| **n == name).count()
    }

    /// Names sorted ascending, or descending when `descending` is set.
    pub fn sorted(&self, descending: bool, limit: Option<usize>) -> Vec<String> {
        let mut names = self.read().clone();
        names.sort();
        if descending {
            names.reverse();
        }
        if let Some(limit) = limit {
            names.truncate(limit);
        }
        names
    }

    /// Routes for ping, subscribe, count and listing.
    pub fn routes(self: &Arc<Self>) -> Vec<Route> {
        let subscribe = Arc::clone(self);
        let named = Arc::clone(self);
        let list = Arc::clone(self);

        vec![
            Route::get("/ping").handler_fn(ping),
            Route::post("/subscribe").handler_fn(move |ctx| subscribe.handle_subscribe(ctx)),
            Route::get("/subscribers/:name")
                .param("name", Coercion::String)
                .handler_fn(move |ctx| named.handle_count(ctx)),
            Route::get("/subscribers-list")
                .query("limit", Coercion::Number)
                .query("order", Coercion::String)
                .handler_fn(move |ctx| list.handle_list(ctx)),
        ]
    }

    fn handle_subscribe(&self, ctx: &mut Context) -> HandlerResult {
        let name = ctx
            .body
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Rejection::bad_request("Must provide a 'name' to subscribe"))?;

        let id = self.subscribe(name);
        Ok(Reply::json(json!({
            "message": format!("Successfully subscribed {}!", name),
            "id": id,
        }))
        .status(StatusCode::CREATED))
    }

    fn handle_count(&self, ctx: &mut Context) -> HandlerResult {
        let name = ctx
            .params
            .get("name")
            .and_then(ParamValue::as_str)
            .ok_or_else(|| Rejection::bad_request("Must provide a 'name'"))?;
        Ok(Reply::json(json!({ "n": self.count(name) })))
    }

    fn handle_list(&self, ctx: &mut Context) -> HandlerResult {
        let descending = ctx.query.get("order").and_then(ParamValue::as_str) == Some("desc");
        let limit = ctx
            .query
            .get("limit")
            .and_then(ParamValue::as_f64)
            .map(|limit| limit.max(0.0) as usize);
        Ok(Reply::json(json!({ "subscribers": self.sorted(descending, limit) })))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<String>> {
        self.names.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<String>> {
        self.names.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn ping(_: &mut Context) -> HandlerResult {
    Ok(Reply::json(json!({ "message": "Hello From Espresso ☕" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_count() {
        let list = SubscriberList::new();
        assert_eq!(list.subscribe("Alice"), 0);
        assert_eq!(list.subscribe("alice"), 1);
        assert_eq!(list.subscribe("bob"), 2);
        assert_eq!(list.count("ALICE"), 2);
        assert_eq!(list.count("carol"), 0);
    }

    #[test]
    fn test_sorted_with_limit() {
        let list = SubscriberList::new();
        for name in ["carol", "alice", "bob"] {
            list.subscribe(name);
        }
        assert_eq!(list.sorted(false, None), vec!["alice", "bob", "carol"]);
        assert_eq!(list.sorted(true, Some(2)), vec!["carol", "bob"]);
        assert!(list.sorted(false, Some(0)).is_empty());
    }

    #[test]
    fn test_routes_compile() {
        let list = Arc::new(SubscriberList::new());
        for route in list.routes() {
            route.compile().unwrap();
        }
    }
}
