//! Broadcast engine
//!
//! Every topic gets a `FanOut` queue when it is created. Publishing enqueues a
//! `Delivery` (the subscriber snapshot plus the update) while the topic is
//! still locked, and a per-topic worker task drains the queue in commit order.
//! For each delivery the worker pushes the `UPDATE_TOPIC` envelope onto every
//! snapshot member's own bounded outbound queue without waiting, so a stalled
//! member only ever backs up its own queue.
//!
//! Delivery is best-effort and at-most-once: a closed connection, or one whose
//! queue is full, is logged and skipped, never retried, and never affects the
//! other members or the publisher's own response.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::broker::message::TopicUpdate;
use crate::client::Client;
use crate::transport::message::Response;

/// One committed publish: the update and the subscribers captured with it.
#[derive(Debug)]
pub struct Delivery {
    pub update: TopicUpdate,
    pub recipients: Vec<Client>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Broadcaster;

impl Broadcaster {
    pub fn new() -> Self {
        Self
    }

    /// Start the fan-out worker for `topic`.
    ///
    /// Must be called from within a Tokio runtime. The worker stops once the
    /// returned `FanOut` is dropped and the queued deliveries are flushed.
    pub fn open(&self, topic: &str) -> FanOut {
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_fanout(*self, topic.to_string(), rx));
        FanOut { queue }
    }

    /// Push one delivery to all of its recipients. Returns how many sends succeeded.
    ///
    /// Never waits on a recipient: the worker drains its queue as fast as it
    /// is fed, whatever state the members' connections are in.
    pub fn deliver(&self, delivery: &Delivery) -> usize {
        let frame = match Response::update(&delivery.update).to_message() {
            Ok(frame) => frame,
            Err(e) => {
                error!(topic = %delivery.update.name, "Failed to serialize update: {e}");
                return 0;
            }
        };

        delivery
            .recipients
            .iter()
            .filter(|client| match client.try_send(frame.clone()) {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        topic = %delivery.update.name,
                        subscriber = %client.id,
                        "Dropping update: {e}"
                    );
                    false
                }
            })
            .count()
    }
}

/// Sending side of a topic's delivery queue.
#[derive(Debug)]
pub struct FanOut {
    queue: mpsc::UnboundedSender<Arc<Delivery>>,
}

impl FanOut {
    /// Queue a delivery without blocking. Returns `false` if the worker is gone.
    pub fn enqueue(&self, delivery: Arc<Delivery>) -> bool {
        self.queue.send(delivery).is_ok()
    }
}

async fn run_fanout(
    broadcaster: Broadcaster,
    topic: String,
    mut rx: mpsc::UnboundedReceiver<Arc<Delivery>>,
) {
    debug!(topic = %topic, "Fan-out started");
    while let Some(delivery) = rx.recv().await {
        let delivered = broadcaster.deliver(&delivery);
        trace!(
            topic = %topic,
            delivered,
            recipients = delivery.recipients.len(),
            "Broadcast complete"
        );
    }
    debug!(topic = %topic, "Fan-out closed");
}
