//! Route guards that authenticate a request and attach `data.user`.

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::users::{without_password, UserStore};
use crate::context::Context;
use crate::handler::{Handler, HandlerResult, Rejection, Reply};
use crate::session::SessionStore;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "sessionId";

/// `ctx.data` key the guards store the authenticated user under.
pub const USER_KEY: &str = "user";

const NO_TOKEN: &str = "No Token!";
const INVALID_SESSION: &str = "Invalid Session";

/// Guard resolving `Authorization: Bearer <token>` to a user.
pub struct BearerProtect<F> {
    users: Arc<dyn UserStore>,
    decode: F,
}

/// Build a bearer guard. `decode` maps a token to the user id it belongs to.
pub fn bearer_protect<F>(users: Arc<dyn UserStore>, decode: F) -> BearerProtect<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    BearerProtect { users, decode }
}

impl<F> Handler for BearerProtect<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let id = ctx
                .bearer()
                .and_then(|token| (self.decode)(token))
                .ok_or_else(|| Rejection::forbidden(NO_TOKEN))?;

            let user = self
                .users
                .get_user(&id)
                .await
                .ok_or_else(|| Rejection::forbidden(NO_TOKEN))?;

            ctx.data.insert(USER_KEY.to_string(), Value::Object(without_password(user)));
            Ok(Reply::next())
        })
    }
}

/// Guard resolving the session cookie to a user.
pub struct SessionProtect {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
}

/// Build a session guard reading the `sessionId` cookie.
pub fn session_protect(sessions: Arc<dyn SessionStore>, users: Arc<dyn UserStore>) -> SessionProtect {
    SessionProtect { sessions, users }
}

impl Handler for SessionProtect {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let invalid = || Rejection::forbidden(INVALID_SESSION);

            let session_id = ctx.cookies.get(SESSION_COOKIE).cloned().ok_or_else(invalid)?;
            let session = self.sessions.get_session(&session_id).await.ok_or_else(invalid)?;
            let user = self.users.get_user(&session.uid).await.ok_or_else(invalid)?;

            ctx.data.insert(USER_KEY.to_string(), Value::Object(without_password(user)));
            Ok(Reply::next())
        })
    }
}
