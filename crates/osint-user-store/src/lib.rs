//! Persistent username/salted-hash store.

mod hashing;
#[cfg(feature = "in-memory")]
mod in_memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryUserStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteUserStore;
pub use traits::{BoxedUserStore, UserStore};
