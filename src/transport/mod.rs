//! The `transport` module is responsible for network communication with
//! clients over WebSockets.
//!
//! It defines the request/response envelopes, the dispatcher that maps
//! requests onto the topic registry, and the WebSocket gateway that owns
//! connections.

pub mod dispatcher;
pub mod message;
pub mod websocket;

pub use dispatcher::Dispatcher;
pub use websocket::{serve, start_websocket_server};

#[cfg(test)]
mod websocket_tests;
