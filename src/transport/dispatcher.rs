//! Request dispatcher
//!
//! Turns one inbound text frame into exactly one `Response`: decode the
//! envelope, run the matching registry operation and map its outcome back
//! into the envelope's `status`/`data`/`error` fields. Broadcasting after a
//! successful publish is started by the registry, so the publisher's response
//! never waits on subscriber delivery.

use std::sync::Arc;

use tracing::debug;

use crate::broker::TopicRegistry;
use crate::client::Client;
use crate::transport::message::{Function, Request, Response, ResponseData};
use crate::utils::error::BrokerError;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<TopicRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Decode and handle one raw request from `client`.
    pub fn dispatch(&self, raw: &str, client: &Client) -> Response {
        match Request::parse(raw) {
            Ok(request) => self.handle(request, client),
            Err(err) => {
                debug!(
                    client = %client.id,
                    "Invalid client message: {err:?} | {}",
                    raw.chars().take(100).collect::<String>()
                );
                Response::malformed(&err)
            }
        }
    }

    pub fn handle(&self, request: Request, client: &Client) -> Response {
        let function = request.function();
        match request {
            Request::SubscribeTopic { name } => {
                let result = self.registry.subscribe(&name, client).map(|outcome| {
                    debug!(client = %client.id, topic = %name, ?outcome, "Subscribed");
                });
                reply(function, ResponseData::Topic { topic: name }, result)
            }

            Request::UnsubscribeTopic { name } => {
                let result = self.registry.unsubscribe(&name, &client.id);
                if result.is_ok() {
                    debug!(client = %client.id, topic = %name, "Unsubscribed");
                }
                reply(function, ResponseData::Topic { topic: name }, result)
            }

            Request::PublishTopic { name, message } => {
                let result = self
                    .registry
                    .publish(&name, &client.id, &message)
                    .map(|delivery| {
                        debug!(
                            client = %client.id,
                            topic = %name,
                            recipients = delivery.recipients.len(),
                            "Published"
                        );
                    });
                reply(
                    function,
                    ResponseData::Published {
                        topic: name,
                        message,
                    },
                    result,
                )
            }

            Request::GetTopicStatus { name } => match self.registry.status(&name, &client.id) {
                Ok(status) => Response::success(
                    function,
                    ResponseData::Status {
                        topic: name,
                        topic_status: status.subscribed.into(),
                        last_update: status.last_update,
                        subscribers: status.subscribers,
                    },
                ),
                Err(err) => Response::failure(
                    function,
                    ResponseData::StatusUnavailable {
                        topic: name,
                        topic_status: String::new(),
                        last_update: String::new(),
                        subscribers: String::new(),
                    },
                    err,
                ),
            },

            Request::ListTopics {} => Response::success(
                function,
                ResponseData::TopicList {
                    topic_list: self.registry.list(),
                },
            ),
        }
    }
}

fn reply(function: Function, data: ResponseData, result: Result<(), BrokerError>) -> Response {
    match result {
        Ok(()) => Response::success(function, data),
        Err(err) => Response::failure(function, data, err),
    }
}
