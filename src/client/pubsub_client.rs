use tokio::sync::mpsc::{self, error::TrySendError};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::topic::SubscriberId;
use crate::utils::error::DeliveryError;

/// Represents a connected WebSocket client in the Pub/Sub system.
///
/// Each client is uniquely identified by an `id` and has a bounded channel
/// (`sender`) feeding the connection's writer task. Cloning a `Client` yields
/// another handle to the same connection; topics hold such clones as their
/// subscriber entries but never own or close the connection itself.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for the connection, generated once at connect time.
    pub id: SubscriberId,

    /// Channel to send WebSocket messages to the client.
    pub sender: mpsc::Sender<WsMessage>,
}

impl Client {
    /// Create a client with a fresh `client-<uuid>` identity.
    pub fn new(sender: mpsc::Sender<WsMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
        }
    }

    /// Queue a frame for the connection, waiting for room in the outbound buffer.
    pub async fn send(&self, msg: WsMessage) -> Result<(), DeliveryError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| DeliveryError::Closed)
    }

    /// Queue a frame only if the outbound buffer has room right now.
    pub fn try_send(&self, msg: WsMessage) -> Result<(), DeliveryError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
