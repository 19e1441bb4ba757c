//! Topic management
//!
//! A `Topic` holds the subscriber entries for a particular topic name and the
//! time of its last successful publish. Subscribers are keyed by their
//! connection identity, so a client can appear at most once per topic.
//!
//! Concurrency note: callers must synchronize access to `Topic` (the registry
//! keeps each topic behind its map shard lock) when modifying subscriptions.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::broker::message::Timestamp;
use crate::client::Client;

pub type SubscriberId = String;

/// Time of the most recent publish on a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastUpdate {
    #[default]
    Never,
    At(Timestamp),
}

impl fmt::Display for LastUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastUpdate::Never => f.write_str("never"),
            LastUpdate::At(ts) => write!(f, "{ts}"),
        }
    }
}

impl Serialize for LastUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashMap<SubscriberId, Client>,
    pub last_update: LastUpdate,
}

impl Topic {
    /// Create a new topic with the given name and no subscribers.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashMap::new(),
            last_update: LastUpdate::Never,
        }
    }

    /// Add a subscriber. Returns `false` and leaves the topic untouched if the
    /// client is already subscribed.
    pub fn subscribe(&mut self, client: Client) -> bool {
        if self.subscribers.contains_key(&client.id) {
            return false;
        }
        self.subscribers.insert(client.id.clone(), client);
        true
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub fn is_subscribed(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Record a publish at `at` and return the timestamp actually stored.
    ///
    /// `last_update` never moves backwards: if the clock regressed since the
    /// previous publish, the previous value is kept and returned.
    pub fn touch(&mut self, at: Timestamp) -> Timestamp {
        let stamped = match self.last_update {
            LastUpdate::At(previous) if previous > at => previous,
            _ => at,
        };
        self.last_update = LastUpdate::At(stamped);
        stamped
    }

    /// Clone the current subscriber handles.
    pub fn snapshot(&self) -> Vec<Client> {
        self.subscribers.values().cloned().collect()
    }
}
