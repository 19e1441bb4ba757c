//! # EchoChat
//!
//! `echochat` is a minimal, in-memory publish/subscribe broker. Clients talk
//! to it over WebSockets with JSON envelopes: they subscribe to named topics,
//! publish messages to them and receive an `UPDATE_TOPIC` push whenever a
//! topic they belong to is published to.
//!
//! ## Core Modules
//!
//! - `broker`: the topic registry and the broadcast engine.
//! - `client`: the handle for one connected client.
//! - `transport`: wire envelopes, the request dispatcher and the WebSocket gateway.
//! - `config`: loading server configuration.
//! - `cli`: a command-line client for the protocol.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod cli;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
