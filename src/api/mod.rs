//! HTTP API layer: server, request/response types, SSE log streaming.

pub mod logs;
pub mod server;
pub mod types;
