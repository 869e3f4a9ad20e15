//! Shared domain types for the OSINT dispatcher core.
//!
//! Every other crate in the workspace depends on this one for the record
//! shapes that cross component boundaries (tasks, sources, results,
//! assignments) and for [`OsintError`], the error enum RPC handlers convert
//! domain failures into.

mod error;
mod result;
mod rpc;
mod source;
mod task;
mod worker;

pub use error::OsintError;
pub use result::ResultEnvelope;
pub use source::Source;
pub use task::{Task, TaskAssignment, TaskFilter, TaskStatus};
pub use worker::WorkerMetrics;

pub type OsintResult<T> = Result<T, OsintError>;
