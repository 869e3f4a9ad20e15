//! Async client for the OSINT dispatcher's two RPC surfaces: the
//! client-facing one ([`DispatcherClient`]) and the collector-facing one
//! ([`CollectorClient`]), both built on a reqwest-based HTTP transport with
//! this protocol's single fixed shape (plain JSON-RPC POST plus one SSE GET
//! per side) and no session-initialisation handshake.

pub mod client;
pub mod error;
pub mod rpc;
pub mod sse;
pub mod worker;

pub use client::DispatcherClient;
pub use error::{OsintClientError, OsintClientResult};
pub use worker::CollectorClient;
