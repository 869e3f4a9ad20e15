//! Persistent task record store.

#[cfg(feature = "in-memory")]
mod in_memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryTaskStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTaskStore;
pub use traits::{BoxedTaskStore, TaskStore};
