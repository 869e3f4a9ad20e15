use async_trait::async_trait;
use osint_protocol::OsintError;

/// Backend-agnostic store of registered users. `register`/`authenticate`
/// are the only two supported operations; records are never mutated or
/// deleted once created.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Registers a new user with a freshly derived salt/hash. Fails with
    /// [`OsintError::Conflict`] if the username already exists.
    async fn register(&self, username: &str, password: &str) -> Result<(), OsintError>;

    /// Re-derives the password hash under the stored salt and compares in
    /// constant time. Returns `Ok(true)`/`Ok(false)` rather than an error
    /// on a bad password, since a wrong password is not itself a fault.
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, OsintError>;
}

pub type BoxedUserStore = std::sync::Arc<dyn UserStore>;
