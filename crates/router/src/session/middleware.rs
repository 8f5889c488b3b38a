use crate::middleware::{abort_with, Flow, Middleware, Next};
use crate::responder::Responder;
use crate::session::{Session, SessionData, SessionStore};
use crate::RequestContext;
use async_trait::async_trait;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Resolves the session of each request from a cookie.
///
/// A request without a known session token gets a fresh, empty session. The session is saved
/// after the rest of the chain ran, and only if it was changed; a new session also sets the
/// cookie. A failing store answers `500 Internal Server Error`.
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
}

impl Sessions {
    pub const DEFAULT_COOKIE_NAME: &'static str = "session_id";

    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store, cookie_name: Self::DEFAULT_COOKIE_NAME.to_owned() }
    }

    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    fn token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, token)| token.to_owned())
    }

    fn set_cookie(&self, token: &str) -> Option<HeaderValue> {
        let cookie = format!("{}={token}; Path=/; HttpOnly; SameSite=Lax", self.cookie_name);
        HeaderValue::from_str(&cookie)
            .map_err(|e| warn!(cookie_name = %self.cookie_name, cause = %e, "cannot set session cookie"))
            .ok()
    }
}

impl fmt::Debug for Sessions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sessions").field("cookie_name", &self.cookie_name).finish_non_exhaustive()
    }
}

#[async_trait]
impl Middleware for Sessions {
    async fn handle(&self, ctx: &mut RequestContext, next: &mut Next<'_>) -> Flow {
        let existing = match self.token(ctx.headers()) {
            Some(token) => match self.store.load(&token).await {
                Ok(data) => data.map(|data| (token, data)),
                Err(e) => {
                    error!(cause = %e, path = ctx.path(), "failed to load session");
                    return abort_with(ctx, (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error"));
                }
            },
            None => None,
        };
        let is_new = existing.is_none();
        let (token, data) = existing.unwrap_or_else(|| (Uuid::new_v4().to_string(), SessionData::new()));

        let session = Session::new(token, data);
        ctx.insert(Session::CONTEXT_KEY, session.clone());
        let flow = next.run(ctx).await;

        let Some((token, data)) = session.changes() else {
            return flow;
        };
        if let Err(e) = self.store.save(&token, data).await {
            error!(cause = %e, path = ctx.path(), "failed to save session");
            let response = (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error").response_to(ctx);
            ctx.set_response(response);
            return flow;
        }
        if is_new && let Some(cookie) = self.set_cookie(&token) {
            ctx.response_mut().headers_mut().append(SET_COOKIE, cookie);
        }
        flow
    }
}
