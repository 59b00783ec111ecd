//! Transport adapters.
//!
//! - `websocket`: the real connection, over `tokio-tungstenite`
//! - `memory`: scripted in-process host used by tests and demos

pub mod memory;
pub mod websocket;
