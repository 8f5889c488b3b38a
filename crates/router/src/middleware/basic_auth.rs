use crate::middleware::{abort_with, Flow, Middleware, Next};
use crate::RequestContext;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::{HeaderValue, Response, StatusCode};
use tracing::debug;

/// Requires HTTP basic authentication with one fixed user.
///
/// Requests without matching credentials are answered with `401 Unauthorized` and a
/// `WWW-Authenticate` challenge. On success the user name is stored under
/// [`BasicAuth::USER_KEY`].
#[derive(Clone)]
pub struct BasicAuth {
    user: String,
    password: String,
    challenge: HeaderValue,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth").field("user", &self.user).finish_non_exhaustive()
    }
}

impl BasicAuth {
    pub const USER_KEY: &'static str = "user";

    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            challenge: HeaderValue::from_static("Basic realm=Restricted"),
        }
    }

    fn credentials(ctx: &RequestContext) -> Option<(String, String)> {
        let value = ctx.headers().get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_owned(), password.to_owned()))
    }
}

#[async_trait]
impl Middleware for BasicAuth {
    async fn handle(&self, ctx: &mut RequestContext, _next: &mut Next<'_>) -> Flow {
        match Self::credentials(ctx) {
            Some((user, password)) if user == self.user && password == self.password => {
                ctx.insert(Self::USER_KEY, user);
                Flow::Proceed
            }
            _ => {
                debug!(path = ctx.path(), "basic authentication failed");
                let mut response = Response::new("Unauthorized");
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                response.headers_mut().insert(WWW_AUTHENTICATE, self.challenge.clone());
                abort_with(ctx, response)
            }
        }
    }
}
