//! Topic registry
//!
//! This module contains the in-memory registry responsible for:
//! - creating topics on first subscribe and deleting them when they empty
//! - tracking subscriber membership and last-update time per topic
//! - committing publishes and handing their subscriber snapshot to the
//!   broadcast engine
//!
//! Concurrency and usage notes:
//! - Topics live in a `DashMap`, so every operation holds exclusive access
//!   to the topic it touches (its shard lock) for the duration of the call
//!   and operations on unrelated topics proceed in parallel.
//! - No operation performs network I/O while holding a lock. Publish only
//!   enqueues the delivery on the topic's fan-out queue; the sends happen on
//!   the fan-out worker.
//! - Topic creation starts a fan-out task, so `subscribe` must run inside a
//!   Tokio runtime.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use crate::broker::broadcast::{Broadcaster, Delivery, FanOut};
use crate::broker::message::{Timestamp, TopicUpdate};
use crate::broker::topic::{LastUpdate, SubscriberId, Topic};
use crate::client::Client;
use crate::utils::error::BrokerError;

/// Result of a successful subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscribed {
    /// The topic did not exist and was created with this subscriber.
    Created,
    /// The subscriber joined an existing topic.
    Joined,
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStatus {
    pub subscribed: bool,
    pub subscribers: usize,
    pub last_update: LastUpdate,
}

#[derive(Debug)]
struct TopicEntry {
    topic: Topic,
    fanout: FanOut,
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: DashMap<String, TopicEntry>,
    broadcaster: Broadcaster,
}

impl TopicRegistry {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self {
            topics: DashMap::new(),
            broadcaster,
        }
    }

    /// Subscribe `client` to `name`, creating the topic if it does not exist.
    pub fn subscribe(&self, name: &str, client: &Client) -> Result<Subscribed, BrokerError> {
        match self.topics.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get_mut().topic.subscribe(client.clone()) {
                    return Err(BrokerError::AlreadySubscribed);
                }
                debug!(topic = %name, subscriber = %client.id, "Joined topic");
                Ok(Subscribed::Joined)
            }
            Entry::Vacant(entry) => {
                let mut topic = Topic::new(name);
                topic.subscribe(client.clone());
                entry.insert(TopicEntry {
                    topic,
                    fanout: self.broadcaster.open(name),
                });
                debug!(topic = %name, subscriber = %client.id, "Created topic");
                Ok(Subscribed::Created)
            }
        }
    }

    /// Remove `id` from `name`. The topic is deleted once its last subscriber leaves.
    pub fn unsubscribe(&self, name: &str, id: &SubscriberId) -> Result<(), BrokerError> {
        let Entry::Occupied(mut entry) = self.topics.entry(name.to_string()) else {
            return Err(BrokerError::TopicNotFound);
        };

        if !entry.get_mut().topic.unsubscribe(id) {
            return Err(BrokerError::NotSubscribed);
        }

        if entry.get().topic.is_empty() {
            entry.remove();
            debug!(topic = %name, subscriber = %id, "Deleted empty topic");
        } else {
            debug!(topic = %name, subscriber = %id, "Left topic");
        }
        Ok(())
    }

    /// Commit a publish by `id` on `name`.
    ///
    /// The timestamp and the subscriber snapshot are taken under the topic
    /// lock, and the delivery is queued for broadcast before the lock is
    /// released, so publishes on one topic are broadcast in commit order.
    pub fn publish(
        &self,
        name: &str,
        id: &SubscriberId,
        message: &str,
    ) -> Result<Arc<Delivery>, BrokerError> {
        let mut guard = self
            .topics
            .get_mut(name)
            .ok_or(BrokerError::TopicNotFound)?;
        let TopicEntry { topic, fanout } = &mut *guard;

        if !topic.is_subscribed(id) {
            return Err(BrokerError::NotSubscribed);
        }

        let timestamp = topic.touch(Timestamp::now());
        let delivery = Arc::new(Delivery {
            update: TopicUpdate {
                name: name.to_string(),
                message: message.to_string(),
                timestamp,
            },
            recipients: topic.snapshot(),
        });

        if !fanout.enqueue(delivery.clone()) {
            warn!(topic = %name, "Fan-out worker gone, update not broadcast");
        }

        Ok(delivery)
    }

    pub fn status(&self, name: &str, id: &SubscriberId) -> Result<TopicStatus, BrokerError> {
        let entry = self.topics.get(name).ok_or(BrokerError::TopicNotFound)?;
        Ok(TopicStatus {
            subscribed: entry.topic.is_subscribed(id),
            subscribers: entry.topic.len(),
            last_update: entry.topic.last_update,
        })
    }

    /// Names of all existing topics, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Remove `id` from every topic it belongs to and return those topic names.
    ///
    /// Used by the gateway when a connection closes.
    pub fn unsubscribe_all(&self, id: &SubscriberId) -> Vec<String> {
        let joined: Vec<String> = self
            .topics
            .iter()
            .filter(|e| e.topic.is_subscribed(id))
            .map(|e| e.key().clone())
            .collect();

        joined
            .into_iter()
            .filter(|name| self.unsubscribe(name, id).is_ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
