//! The `error` module defines the error types used within the `echochat` application.
//!
//! Domain and protocol errors never escape a request: the dispatcher turns them
//! into failure envelopes. Their `Display` strings are the exact error texts
//! sent to clients, so changing them changes the wire protocol.

use std::io;

use thiserror::Error;

/// Errors returned by topic registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("you are already subscribed to that list")]
    AlreadySubscribed,

    #[error("you are not subscribed to that topic")]
    NotSubscribed,

    #[error("topic does not exist")]
    TopicNotFound,
}

/// A request that could not be decoded into a known operation.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("could not interpret request")]
    Malformed(#[source] serde_json::Error),

    #[error("could not interpret request")]
    NotText,
}

/// Failure to push a single frame to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,

    #[error("outbound queue full")]
    Full,
}

/// Fatal errors raised while bringing the server up.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the command-line client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("missing required argument --{0}")]
    MissingArgument(&'static str),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}
