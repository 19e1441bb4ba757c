//! Update payloads and broker timestamps
//!
//! `TopicUpdate` is what a successful publish hands to the broadcast engine:
//! the topic name, the published text and the commit timestamp. Timestamps
//! are local wall-clock time truncated to whole seconds and rendered as
//! `YYYY-MM-DD HH:MM:SS` on the wire.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Serialize, Serializer};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Current local time, second precision.
    pub fn now() -> Self {
        Self(Local::now().naive_local().trunc_subsecs(0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map(Self)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Payload of an `UPDATE_TOPIC` push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicUpdate {
    pub name: String,
    pub message: String,
    pub timestamp: Timestamp,
}
