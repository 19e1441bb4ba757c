//! Wire envelopes
//!
//! Requests are `{"function": <FN>, "parameters": {...}}` and decode straight
//! into the `Request` union, so an unknown function or a missing parameter is
//! rejected here, before anything reaches the registry. Responses serialize
//! with their keys in protocol order: `status`, `function`, `data`, `error`.

use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::message::TopicUpdate;
use crate::broker::topic::LastUpdate;
use crate::utils::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "function",
    content = "parameters",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum Request {
    SubscribeTopic { name: String },
    UnsubscribeTopic { name: String },
    PublishTopic { name: String, message: String },
    GetTopicStatus { name: String },
    ListTopics {},
}

impl Request {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(ProtocolError::Malformed)
    }

    pub fn function(&self) -> Function {
        match self {
            Request::SubscribeTopic { .. } => Function::SubscribeTopic,
            Request::UnsubscribeTopic { .. } => Function::UnsubscribeTopic,
            Request::PublishTopic { .. } => Function::PublishTopic,
            Request::GetTopicStatus { .. } => Function::GetTopicStatus,
            Request::ListTopics {} => Function::ListTopics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Function {
    SubscribeTopic,
    UnsubscribeTopic,
    PublishTopic,
    GetTopicStatus,
    ListTopics,
    /// Server push sent to subscribers; never a valid request.
    UpdateTopic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubscriptionState {
    #[serde(rename = "subscribed")]
    Subscribed,
    #[serde(rename = "not subscribed")]
    NotSubscribed,
}

impl From<bool> for SubscriptionState {
    fn from(subscribed: bool) -> Self {
        if subscribed {
            SubscriptionState::Subscribed
        } else {
            SubscriptionState::NotSubscribed
        }
    }
}

/// Function-specific `data` payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Topic {
        topic: String,
    },
    Published {
        topic: String,
        message: String,
    },
    Status {
        topic: String,
        topic_status: SubscriptionState,
        last_update: LastUpdate,
        subscribers: usize,
    },
    /// Status of a topic that does not exist: every field but `topic` is blank.
    StatusUnavailable {
        topic: String,
        topic_status: String,
        last_update: String,
        subscribers: String,
    },
    TopicList {
        topic_list: Vec<String>,
    },
    Update(TopicUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<Function>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    pub error: String,
}

impl Response {
    pub fn success(function: Function, data: ResponseData) -> Self {
        Self {
            status: Status::Success,
            function: Some(function),
            data: Some(data),
            error: String::new(),
        }
    }

    pub fn failure(function: Function, data: ResponseData, error: impl ToString) -> Self {
        Self {
            status: Status::Failure,
            function: Some(function),
            data: Some(data),
            error: error.to_string(),
        }
    }

    /// Reply to a request that could not be decoded. Carries no `function` or `data`.
    pub fn malformed(err: &ProtocolError) -> Self {
        Self {
            status: Status::Failure,
            function: None,
            data: None,
            error: err.to_string(),
        }
    }

    /// The unsolicited push delivered to subscribers after a publish.
    pub fn update(update: &TopicUpdate) -> Self {
        Self::success(Function::UpdateTopic, ResponseData::Update(update.clone()))
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_message(&self) -> Result<WsMessage, serde_json::Error> {
        self.to_json().map(WsMessage::text)
    }
}
