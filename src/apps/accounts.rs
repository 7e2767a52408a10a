//! Session-backed account routes.
//!
//! | Route                | Behaviour                                          |
//! |----------------------|----------------------------------------------------|
//! | `POST /auth/signup`  | create a user, open a session, set `sessionId`     |
//! | `POST /auth/signin`  | check credentials, open a session, set `sessionId` |
//! | `GET /auth/account`  | `session_protect`, then `{ "user": data.user }`    |
//! | `POST /auth/logout`  | `session_protect`, end the session, clear cookie   |

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{session_protect, InMemoryUserStore, UserStore, SESSION_COOKIE, USER_KEY};
use crate::context::Context;
use crate::handler::{Handler, HandlerResult, Rejection, Reply};
use crate::routing::Route;
use crate::session::{Fields, SessionStore};

const MISSING_SIGNUP_FIELDS: &str = "You must provide an email,username and password to sign up";
const MISSING_SIGNIN_FIELDS: &str = "You must provide an email and password to sign in";

/// Users and sessions shared by the account routes.
#[derive(Clone)]
pub struct AccountsApp {
    users: Arc<InMemoryUserStore>,
    sessions: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl AccountsApp {
    /// Create the account app over the given stores.
    pub fn new(users: Arc<InMemoryUserStore>, sessions: Arc<dyn SessionStore>, session_ttl: Duration) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    /// Routes for signup, signin, account and logout.
    pub fn routes(&self) -> Vec<Route> {
        let user_store: Arc<dyn UserStore> = self.users.clone();
        let guard = Arc::new(session_protect(self.sessions.clone(), user_store));

        vec![
            Route::post("/auth/signup").with(SignUp(self.clone())),
            Route::post("/auth/signin").with(SignIn(self.clone())),
            Route::get("/auth/account").with_shared(guard.clone()).handler_fn(account),
            Route::post("/auth/logout").with_shared(guard).with(LogOut(self.clone())),
        ]
    }

    /// Open a session for `uid` and hand its id to the client.
    async fn start_session(&self, ctx: &mut Context, uid: String) -> Result<(), Rejection> {
        let mut fields = Fields::new();
        fields.insert("uid".to_string(), Value::String(uid));

        let session_id = self
            .sessions
            .create_session(fields, self.session_ttl)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create session");
                Rejection::internal("Could not create session!")
            })?;

        ctx.set_cookies([(SESSION_COOKIE, session_id)]).map_err(|e| {
            tracing::error!(error = %e, "Failed to set session cookie");
            Rejection::internal("Could not create session!")
        })
    }
}

fn body_str<'a>(ctx: &'a Context, key: &str) -> Option<&'a str> {
    ctx.body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

struct SignUp(AccountsApp);

impl Handler for SignUp {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let (Some(email), Some(password), Some(username)) = (
                body_str(ctx, "email"),
                body_str(ctx, "password"),
                body_str(ctx, "username"),
            ) else {
                return Err(Rejection::bad_request(MISSING_SIGNUP_FIELDS));
            };
            let email = Value::String(email.to_string());

            if self.0.users.find_by("email", &email).is_some() {
                return Err(Rejection::new("Email already registered", StatusCode::CONFLICT));
            }

            let mut fields = Fields::new();
            fields.insert("email".to_string(), email);
            fields.insert("password".to_string(), Value::String(password.to_string()));
            fields.insert("username".to_string(), Value::String(username.to_string()));

            let uid = self
                .0
                .users
                .create_user(fields)
                .await
                .ok_or_else(|| Rejection::bad_request(MISSING_SIGNUP_FIELDS))?;

            self.0.start_session(ctx, uid).await?;
            Ok(Reply::json(json!({ "message": "Signed Up Successfully!" })).status(StatusCode::CREATED))
        })
    }
}

struct SignIn(AccountsApp);

impl Handler for SignIn {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let (Some(email), Some(password)) = (body_str(ctx, "email"), body_str(ctx, "password")) else {
                return Err(Rejection::bad_request(MISSING_SIGNIN_FIELDS));
            };

            let uid = self
                .0
                .users
                .find_by("email", &Value::String(email.to_string()))
                .filter(|user| user.get("password").and_then(Value::as_str) == Some(password))
                .and_then(|user| user.get("uid").and_then(Value::as_str).map(str::to_string))
                .ok_or_else(|| Rejection::forbidden("Invalid Credentials"))?;

            self.0.start_session(ctx, uid).await?;
            Ok(Reply::json(json!({ "message": "Signed in Successfully!" })).status(StatusCode::CREATED))
        })
    }
}

struct LogOut(AccountsApp);

impl Handler for LogOut {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if let Some(session_id) = ctx.cookies.get(SESSION_COOKIE).cloned() {
                self.0.sessions.end_session(&session_id).await;
            }
            ctx.set_cookies([(SESSION_COOKIE, "")])
                .map_err(|e| Rejection::internal(e.to_string()))?;
            Ok(Reply::json(json!({ "message": "Signed Out" })))
        })
    }
}

fn account(ctx: &mut Context) -> HandlerResult {
    Ok(Reply::json(json!({ "user": ctx.data.get(USER_KEY) })))
}
