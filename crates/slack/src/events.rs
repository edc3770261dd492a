use std::sync::Arc;

use async_trait::async_trait;
use dashshare_core::errors::ApplicationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::tasks::TaskSupervisor;
use crate::unfurl::UnfurlError;

pub const URL_VERIFICATION: &str = "url_verification";
pub const EVENT_CALLBACK: &str = "event_callback";
pub const LINK_SHARED: &str = "link_shared";
pub const CONVERSATIONS_HISTORY: &str = "conversations_history";

/// Webhook body delivered by the Slack Events API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPayload {
    pub token: String,
    pub team_id: String,
    pub api_app_id: String,
    pub event: Event,
    #[serde(rename = "type")]
    pub payload_type: String,
    pub event_id: String,
    pub event_time: i64,
    pub authorizations: Vec<Authorization>,
    pub is_ext_shared_channel: bool,
    pub event_context: String,
    pub challenge: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub user: String,
    pub channel: String,
    pub message_ts: String,
    pub links: Vec<Link>,
    pub source: String,
    pub unfurl_id: String,
    pub is_bot_user_member: bool,
    pub event_ts: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    pub url: String,
    pub domain: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Authorization {
    pub enterprise_id: Option<String>,
    pub team_id: String,
    pub user_id: String,
    pub is_bot: bool,
    pub is_enterprise_install: bool,
}

/// A `link_shared` event posted from a conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkSharedEvent {
    pub event_id: String,
    pub channel: String,
    pub message_ts: String,
    pub user: String,
    pub links: Vec<Link>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    UrlVerification { challenge: String },
    LinkShared(LinkSharedEvent),
}

impl EventPayload {
    /// Classifies the payload into one of the supported shapes.
    pub fn classify(self) -> Result<SlackEvent, DispatchError> {
        match self.payload_type.as_str() {
            URL_VERIFICATION => Ok(SlackEvent::UrlVerification { challenge: self.challenge }),
            EVENT_CALLBACK
                if self.event.event_type == LINK_SHARED
                    && self.event.source == CONVERSATIONS_HISTORY =>
            {
                Ok(SlackEvent::LinkShared(LinkSharedEvent {
                    event_id: self.event_id,
                    channel: self.event.channel,
                    message_ts: self.event.message_ts,
                    user: self.event.user,
                    links: self.event.links,
                }))
            }
            _ => Err(DispatchError::Unhandled {
                payload_type: self.payload_type,
                event_type: self.event.event_type,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Echo the challenge back to complete the URL verification handshake.
    Challenge(String),
    /// Unfurling continues in the background.
    Scheduled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("could not decode slack event payload: {0}")]
    Malformed(String),
    #[error("unhandled event type `{payload_type}`/`{event_type}`")]
    Unhandled { payload_type: String, event_type: String },
}

impl From<DispatchError> for ApplicationError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::Malformed(message) => Self::MalformedRequest(message),
            DispatchError::Unhandled { .. } => Self::UnhandledEvent(error.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Unfurl(#[from] UnfurlError),
}

#[async_trait]
pub trait LinkSharedHandler: Send + Sync {
    async fn handle(
        &self,
        event: &LinkSharedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

pub fn decode_payload(body: &[u8]) -> Result<EventPayload, DispatchError> {
    serde_json::from_slice(body).map_err(|error| DispatchError::Malformed(error.to_string()))
}

/// Classifies inbound webhooks and hands link-shared events to the
/// background supervisor so the HTTP response never waits on them.
#[derive(Clone)]
pub struct EventDispatcher {
    link_shared: Option<Arc<dyn LinkSharedHandler>>,
    tasks: TaskSupervisor,
}

impl EventDispatcher {
    pub fn new(tasks: TaskSupervisor) -> Self {
        Self { link_shared: None, tasks }
    }

    pub fn register_link_shared<H>(&mut self, handler: H)
    where
        H: LinkSharedHandler + 'static,
    {
        self.link_shared = Some(Arc::new(handler));
    }

    pub fn dispatch_raw(
        &self,
        body: &[u8],
        ctx: &EventContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        let payload = decode_payload(body)?;
        self.dispatch(payload, ctx)
    }

    pub fn dispatch(
        &self,
        payload: EventPayload,
        ctx: &EventContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        match payload.classify()? {
            SlackEvent::UrlVerification { challenge } => {
                info!(
                    event_name = "slack.events.url_verification",
                    correlation_id = %ctx.correlation_id,
                    "answering url verification challenge"
                );
                Ok(DispatchOutcome::Challenge(challenge))
            }
            SlackEvent::LinkShared(event) => {
                let Some(handler) = self.link_shared.clone() else {
                    return Err(DispatchError::Unhandled {
                        payload_type: EVENT_CALLBACK.to_owned(),
                        event_type: LINK_SHARED.to_owned(),
                    });
                };

                info!(
                    event_name = "slack.events.link_shared",
                    correlation_id = %ctx.correlation_id,
                    slack_event_id = %event.event_id,
                    channel = %event.channel,
                    links = event.links.len(),
                    "scheduling link unfurl"
                );
                let ctx = ctx.clone();
                self.tasks.spawn("slack.unfurl", ctx.correlation_id.clone(), async move {
                    handler.handle(&event, &ctx).await
                });
                Ok(DispatchOutcome::Scheduled)
            }
        }
    }
}
