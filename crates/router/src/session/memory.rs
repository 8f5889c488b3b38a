use crate::session::{SessionData, SessionError, SessionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps sessions in process memory. Sessions are lost on restart and never expire.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn save(&self, token: &str, data: SessionData) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if data.is_empty() {
            sessions.remove(token);
        } else {
            sessions.insert(token.to_owned(), data);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemorySessionStore;
    use crate::session::{SessionData, SessionStore};
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemorySessionStore::new();
        assert!(store.load("token").await.unwrap().is_none());

        let mut data = SessionData::new();
        data.insert("username".into(), json!("admin"));
        store.save("token", data.clone()).await.unwrap();
        assert_eq!(store.load("token").await.unwrap(), Some(data));
        assert_eq!(store.len().await, 1);

        store.save("token", SessionData::new()).await.unwrap();
        assert!(store.is_empty().await);
    }
}
