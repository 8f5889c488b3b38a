//! Cookie keyed sessions.
//!
//! The [`Sessions`] middleware resolves the session of a request through a [`SessionStore`] and
//! exposes it to handlers as a [`Session`] handle. The router itself never looks inside
//! session data, storage is entirely up to the store.

mod memory;
mod middleware;

pub use memory::MemorySessionStore;
pub use middleware::Sessions;

use crate::body::ResponseBody;
use crate::extract::{ExtractError, FromRequest};
use crate::responder::Responder;
use crate::RequestContext;
use async_trait::async_trait;
use http::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::error;

/// The values stored in one session.
pub type SessionData = HashMap<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session store is unavailable: {message}")]
    Unavailable { message: String },

    #[error("session value '{key}' cannot be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    pub fn unavailable<S: ToString>(str: S) -> Self {
        Self::Unavailable { message: str.to_string() }
    }
}

/// Session failures are not the client's fault, they answer `500` and are logged.
impl Responder for SessionError {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        error!(cause = %self, path = req.path(), "session failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error").response_to(req)
    }
}

/// Loads and saves session data by token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `None` for unknown or expired tokens.
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError>;

    async fn save(&self, token: &str, data: SessionData) -> Result<(), SessionError>;
}

/// The session of the current request.
///
/// Handles are cheap to clone and all clones share the same data. Changes are saved by the
/// [`Sessions`] middleware once the rest of the chain has run.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

#[derive(Debug)]
struct SessionState {
    token: String,
    data: SessionData,
    modified: bool,
}

impl Session {
    pub(crate) const CONTEXT_KEY: &'static str = "micro_router::session";

    pub(crate) fn new(token: String, data: SessionData) -> Self {
        Self { inner: Arc::new(Mutex::new(SessionState { token, data, modified: false })) }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> String {
        self.state().token.clone()
    }

    /// Reads `key`, `None` when it is absent or has a different type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.state().data.get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<(), SessionError> {
        let key = key.into();
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(source) => return Err(SessionError::Encode { key, source }),
        };

        let mut state = self.state();
        state.data.insert(key, value);
        state.modified = true;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.state();
        let removed = state.data.remove(key).is_some();
        state.modified |= removed;
        removed
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.modified |= !state.data.is_empty();
        state.data.clear();
    }

    /// The token and data to save, `None` when nothing changed.
    pub(crate) fn changes(&self) -> Option<(String, SessionData)> {
        let state = self.state();
        state.modified.then(|| (state.token.clone(), state.data.clone()))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Session").field("keys", &state.data.keys().collect::<Vec<_>>()).finish_non_exhaustive()
    }
}

impl FromRequest for Session {
    type Error = ExtractError;

    fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
        ctx.get::<Session>(Self::CONTEXT_KEY).cloned().ok_or_else(|| ExtractError::missing("session"))
    }
}
