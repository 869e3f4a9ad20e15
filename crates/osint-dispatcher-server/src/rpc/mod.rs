pub mod client;
pub mod params;
pub mod worker;

pub use client::ClientRpcHandler;
pub use worker::CollectorRpcHandler;
