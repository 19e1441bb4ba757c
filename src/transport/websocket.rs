//! WebSocket transport
//!
//! This file implements the connection gateway. Responsibilities:
//! - Accept TCP/WebSocket connections, up to `server.max_connections` at once
//! - Give every connection a fresh `Client` identity and a bounded outbound
//!   queue drained by a dedicated writer task
//! - Feed each text frame to the `Dispatcher` and queue exactly one response
//! - On disconnect, remove the client from every topic it joined

use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::sleep;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::TopicRegistry;
use crate::broker::topic::SubscriberId;
use crate::client::Client;
use crate::config::Settings;
use crate::transport::dispatcher::Dispatcher;
use crate::transport::message::Response;
use crate::utils::error::{ProtocolError, ServerError};

/// Bind `settings.server` and serve connections until the listener fails.
pub async fn start_websocket_server(
    registry: Arc<TopicRegistry>,
    settings: Settings,
) -> Result<(), ServerError> {
    let addr = settings.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("WebSocket server listening on ws://{addr}");

    serve(listener, registry, settings).await;
    Ok(())
}

const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Errors that only concern the peer being accepted; the listener itself is fine.
pub(crate) fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

/// Delay before the next accept after a listener-level failure (e.g. EMFILE).
pub(crate) fn next_accept_backoff(current: Option<Duration>) -> Duration {
    match current {
        None => MIN_ACCEPT_BACKOFF,
        Some(d) => (d * 2).min(MAX_ACCEPT_BACKOFF),
    }
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, registry: Arc<TopicRegistry>, settings: Settings) {
    let dispatcher = Arc::new(Dispatcher::new(registry));
    let permits = Arc::new(Semaphore::new(settings.server.max_connections));
    let outbound_buffer = settings.broker.outbound_buffer.max(1);

    let mut backoff = None;

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => {
                backoff = None;
                accepted
            }
            Err(e) if is_transient_accept_error(&e) => {
                debug!("Peer went away during accept: {e}");
                continue;
            }
            Err(e) => {
                let delay = next_accept_backoff(backoff);
                backoff = Some(delay);
                error!("Failed to accept connection: {e}, retrying in {delay:?}");
                sleep(delay).await;
                continue;
            }
        };

        let Ok(permit) = permits.clone().try_acquire_owned() else {
            warn!(%peer, "Connection limit reached, refusing connection");
            continue;
        };

        let dispatcher = dispatcher.clone();
        spawn(async move {
            handle_connection(stream, dispatcher, outbound_buffer).await;
            drop(permit);
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Registry-facing side of one connection.
///
/// Closing it, explicitly or by dropping it, unsubscribes the client from
/// every topic exactly once.
#[derive(Debug)]
pub struct Connection {
    client: Client,
    registry: Arc<TopicRegistry>,
    state: ConnectionState,
}

impl Connection {
    pub fn new(client: Client, registry: Arc<TopicRegistry>) -> Self {
        Self {
            client,
            registry,
            state: ConnectionState::Connecting,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn open(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
            info!(client = %self.client.id, "Client connected");
        }
    }

    pub fn close(&mut self) {
        let previous = std::mem::replace(&mut self.state, ConnectionState::Closed);
        if previous != ConnectionState::Open {
            return;
        }

        let topics = self.registry.unsubscribe_all(&self.client.id);
        for topic in &topics {
            debug!(client = %self.client.id, topic = %topic, "Unsubscribed on disconnect");
        }
        info!(client = %self.client.id, topics = topics.len(), "Client disconnected");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn handle_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>, outbound_buffer: usize) {
    let (tx, rx) = mpsc::channel::<WsMessage>(outbound_buffer);
    let mut connection = Connection::new(Client::new(tx), dispatcher.registry().clone());

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };
    connection.open();

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    spawn(write_loop(connection.client().id.clone(), ws_sender, rx));

    while let Some(frame) = ws_receiver.next().await {
        let response = match frame {
            Ok(WsMessage::Text(text)) => dispatcher.dispatch(text.as_str(), connection.client()),
            Ok(WsMessage::Binary(_)) => Response::malformed(&ProtocolError::NotText),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(client = %connection.client().id, "WebSocket read error: {e}");
                break;
            }
        };

        let reply = match response.to_message() {
            Ok(reply) => reply,
            Err(e) => {
                error!(client = %connection.client().id, "Failed to serialize response: {e}");
                continue;
            }
        };

        if let Err(e) = connection.client().send(reply).await {
            debug!(client = %connection.client().id, "Dropping response: {e}");
            break;
        }
    }

    connection.close();
}

/// Forward queued frames to the socket until every handle to the queue is gone.
async fn write_loop(
    client_id: SubscriberId,
    mut ws_sender: SplitSink<WebSocketStream<TcpStream>, WsMessage>,
    mut rx: mpsc::Receiver<WsMessage>,
) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = ws_sender.send(msg).await {
            debug!("Failed to send message to {client_id}: {e}");
            break;
        }
    }

    let _ = ws_sender.close().await;
    debug!("Send loop closed for {client_id}");
}
