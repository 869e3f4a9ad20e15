use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

/// Client-side auth session table: token -> username. In-memory and
/// discarded on restart. Last-write-wins on reissue.
#[derive(Default)]
pub struct AuthSessions {
    tokens: RwLock<std::collections::HashMap<String, String>>,
}

impl AuthSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.write().await.insert(token.clone(), username.to_string());
        token
    }

    pub async fn username_for(&self, token: &str) -> Option<String> {
        self.tokens.read().await.get(token).cloned()
    }
}

pub type SharedAuthSessions = Arc<AuthSessions>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_token_resolves_to_the_username() {
        let sessions = AuthSessions::new();
        let token = sessions.issue("alice").await;
        assert_eq!(sessions.username_for(&token).await, Some("alice".to_string()));
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let sessions = AuthSessions::new();
        assert_eq!(sessions.username_for("bogus").await, None);
    }
}
