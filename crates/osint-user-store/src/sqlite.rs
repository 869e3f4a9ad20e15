use async_trait::async_trait;
use osint_protocol::OsintError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::hashing;
use crate::traits::UserStore;

/// Sqlite-backed `UserStore`.
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub async fn new(db_path: &str) -> Result<Self, OsintError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| OsintError::Internal(format!("failed to open user db: {e}")))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), OsintError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| OsintError::Internal(format!("failed to migrate user db: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn register(&self, username: &str, password: &str) -> Result<(), OsintError> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| OsintError::Internal(format!("user lookup failed: {e}")))?;
        if exists.is_some() {
            return Err(OsintError::Conflict(format!("user '{username}' already exists")));
        }

        let salt = hashing::generate_salt();
        let password_hash = hashing::derive(password, &salt);
        sqlx::query("INSERT INTO users (username, password_hash, salt) VALUES (?, ?, ?)")
            .bind(username)
            .bind(&password_hash)
            .bind(&salt)
            .execute(&self.pool)
            .await
            .map_err(|e| OsintError::Internal(format!("failed to insert user: {e}")))?;
        Ok(())
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, OsintError> {
        let row = sqlx::query("SELECT password_hash, salt FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| OsintError::Internal(format!("user lookup failed: {e}")))?;

        match row {
            Some(row) => {
                let password_hash: String = row.get("password_hash");
                let salt: String = row.get("salt");
                Ok(hashing::verify(password, &salt, &password_hash))
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteUserStore {
        SqliteUserStore::new(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let store = store().await;
        store.register("alice", "pw").await.unwrap();
        assert!(store.authenticate("alice", "pw").await.unwrap());
        assert!(!store.authenticate("alice", "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_register_conflicts() {
        let store = store().await;
        store.register("alice", "pw").await.unwrap();
        assert!(store.register("alice", "pw").await.is_err());
    }
}
