use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use osint_protocol::OsintError;
use tokio::sync::RwLock;

use crate::hashing;
use crate::traits::UserStore;

struct UserRecord {
    password_hash: String,
    salt: String,
}

/// In-memory `UserStore`, the default backend — no external state needed
/// to run the dispatcher for demos and tests.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn register(&self, username: &str, password: &str) -> Result<(), OsintError> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(OsintError::Conflict(format!("user '{username}' already exists")));
        }
        let salt = hashing::generate_salt();
        let password_hash = hashing::derive(password, &salt);
        users.insert(username.to_string(), UserRecord { password_hash, salt });
        Ok(())
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, OsintError> {
        let users = self.users.read().await;
        match users.get(username) {
            Some(record) => Ok(hashing::verify(password, &record.salt, &record.password_hash)),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_authenticate() {
        let store = InMemoryUserStore::new();
        store.register("alice", "pw").await.unwrap();
        assert!(store.authenticate("alice", "pw").await.unwrap());
        assert!(!store.authenticate("alice", "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_register_conflicts() {
        let store = InMemoryUserStore::new();
        store.register("alice", "pw").await.unwrap();
        let err = store.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, OsintError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_user_does_not_authenticate() {
        let store = InMemoryUserStore::new();
        assert!(!store.authenticate("nobody", "pw").await.unwrap());
    }
}
