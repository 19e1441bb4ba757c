//! Command-line client
//!
//! A thin consumer of the wire protocol: it turns one command into requests,
//! sends them over a single connection and prints every envelope it gets
//! back, either raw (`json`) or as a one-line summary (`human`).
//! `subscribe` and `publish` keep the connection open and print updates until
//! the server closes it or Ctrl-C is pressed.

mod render;

use clap::{Args, ValueEnum};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

use crate::transport::message::Request;
use crate::utils::error::ClientError;

pub use render::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Output {
    Json,
    Human,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClientCommand {
    /// List all existing topics
    List,
    /// Show information about a topic
    Status,
    /// Subscribe to a topic and print its updates
    Subscribe,
    /// Subscribe to a topic, publish a message and print its updates
    Publish,
}

#[derive(Debug, Clone, Args)]
pub struct ClientArgs {
    /// The command to run
    #[arg(value_enum)]
    pub command: ClientCommand,

    /// The topic parameter
    #[arg(short, long)]
    pub topic: Option<String>,

    /// The message to publish
    #[arg(short, long)]
    pub message: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Output::Json)]
    pub output: Output,

    /// WebSocket server URL to connect to
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    pub url: String,
}

impl ClientArgs {
    /// Requests to send, in order.
    pub fn requests(&self) -> Result<Vec<Request>, ClientError> {
        let topic = || {
            self.topic
                .clone()
                .ok_or(ClientError::MissingArgument("topic"))
        };

        Ok(match self.command {
            ClientCommand::List => vec![Request::ListTopics {}],
            ClientCommand::Status => vec![Request::GetTopicStatus { name: topic()? }],
            ClientCommand::Subscribe => vec![Request::SubscribeTopic { name: topic()? }],
            ClientCommand::Publish => {
                let name = topic()?;
                let message = self
                    .message
                    .clone()
                    .ok_or(ClientError::MissingArgument("message"))?;
                vec![
                    Request::SubscribeTopic { name: name.clone() },
                    Request::PublishTopic { name, message },
                ]
            }
        })
    }

    /// Whether the client keeps listening for updates after its replies.
    pub fn follows(&self) -> bool {
        matches!(
            self.command,
            ClientCommand::Subscribe | ClientCommand::Publish
        )
    }
}

pub async fn run(args: ClientArgs) -> Result<(), ClientError> {
    let requests = args.requests()?;
    let (mut ws_stream, _response) = connect_async(args.url.as_str()).await?;
    debug!("Connected to {}", args.url);

    for request in &requests {
        let payload = serde_json::to_string(request)?;
        ws_stream.send(WsMessage::text(payload)).await?;
    }

    let mut replies = 0;
    loop {
        tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    println!("{}", render(text.as_str(), args.output));
                    replies += 1;
                    if !args.follows() && replies >= requests.len() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = ws_stream.close(None).await;
    Ok(())
}
