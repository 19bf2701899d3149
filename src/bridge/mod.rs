//! Remote-call bridge to the application under test
//!
//! Scenarios drive a separately hosted app process over a local IPC socket:
//! operations are invoked by name, control messages nudge the host, and
//! poll composites wait for app state to settle.

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::BridgeClient;
pub use protocol::{Call, Request, Response, StatusResult};
