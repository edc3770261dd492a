//! Slack Web API client.
//!
//! Three methods serve the sharing flows: `conversations.list`,
//! `chat.postMessage` and `chat.unfurl`. `auth.test` backs readiness checks.
//! Every call authenticates with the bot token. There is no
//! retry or rate-limit handling; a failed call surfaces as a
//! [`SlackApiError`] naming the stage that failed.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use dashshare_core::config::SlackConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
#[cfg(any(test, feature = "test-support"))]
use tokio::sync::Mutex;
use tracing::debug;

use crate::blocks::{Block, MessageTemplate};

/// Upper bound on `conversations.list` pages fetched per call.
pub const MAX_CONVERSATION_PAGES: usize = 20;
const CONVERSATION_PAGE_SIZE: &str = "200";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostMessageRequest {
    pub channel: String,
    pub text: String,
    pub blocks: Vec<Block>,
}

impl PostMessageRequest {
    pub fn new(channel: impl Into<String>, message: &MessageTemplate) -> Self {
        Self {
            channel: channel.into(),
            text: message.fallback_text.clone(),
            blocks: message.blocks.clone(),
        }
    }
}

/// Who the bot token belongs to, as reported by `auth.test`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Unfurl {
    pub blocks: Vec<Block>,
}

/// Body of `chat.unfurl`: the shared URLs mapped to their preview layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnfurlRequest {
    pub channel: String,
    pub ts: String,
    pub unfurls: BTreeMap<String, Unfurl>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("could not build slack request for `{method}`: {message}")]
    Build { method: &'static str, message: String },
    #[error("slack request to `{method}` failed: {message}")]
    Transport { method: &'static str, message: String },
    #[error("could not read slack response from `{method}`: {message}")]
    Read { method: &'static str, message: String },
    #[error("could not decode slack response from `{method}`: {message}")]
    Decode { method: &'static str, message: String },
    #[error("slack `{method}` returned error `{error}`")]
    Api { method: &'static str, error: String },
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn auth_test(&self) -> Result<AuthIdentity, SlackApiError>;
    async fn list_conversations(&self) -> Result<Vec<Channel>, SlackApiError>;
    async fn post_message(&self, request: &PostMessageRequest) -> Result<(), SlackApiError>;
    async fn unfurl(&self, request: &UnfurlRequest) -> Result<(), SlackApiError>;
}

#[derive(Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ConversationsPage {
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct Ignored {}

enum Body<'a, T: Serialize + ?Sized> {
    Json(&'a T),
    Form(&'a T),
}

pub struct HttpSlackClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl HttpSlackClient {
    pub fn new(config: &SlackConfig) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| SlackApiError::Build {
                method: "client",
                message: error.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
        })
    }

    async fn call<B, T>(&self, method: &'static str, body: Body<'_, B>) -> Result<T, SlackApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{method}", self.base_url);
        let builder = self.http.post(url).bearer_auth(self.bot_token.expose_secret());
        let builder = match body {
            Body::Json(body) => builder.json(body),
            Body::Form(body) => builder.form(body),
        };
        let request = builder
            .build()
            .map_err(|error| SlackApiError::Build { method, message: error.to_string() })?;

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|error| SlackApiError::Transport { method, message: error.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackApiError::Transport {
                method,
                message: format!("unexpected http status {status}"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| SlackApiError::Read { method, message: error.to_string() })?;

        let envelope: ApiEnvelope = serde_json::from_slice(&bytes)
            .map_err(|error| SlackApiError::Decode { method, message: error.to_string() })?;
        if !envelope.ok {
            return Err(SlackApiError::Api {
                method,
                error: envelope.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|error| SlackApiError::Decode { method, message: error.to_string() })
    }
}

#[async_trait]
impl SlackApi for HttpSlackClient {
    async fn auth_test(&self) -> Result<AuthIdentity, SlackApiError> {
        let no_params: [(&str, &str); 0] = [];
        self.call("auth.test", Body::Form(&no_params)).await
    }

    async fn list_conversations(&self) -> Result<Vec<Channel>, SlackApiError> {
        let mut channels = Vec::new();
        let mut cursor = String::new();

        for page in 1..=MAX_CONVERSATION_PAGES {
            let mut params =
                vec![("exclude_archived", "true"), ("limit", CONVERSATION_PAGE_SIZE)];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.as_str()));
            }

            let response: ConversationsPage =
                self.call("conversations.list", Body::Form(&params)).await?;
            channels.extend(response.channels);

            cursor = response.response_metadata.map(|meta| meta.next_cursor).unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
            debug!(
                event_name = "slack.conversations.page",
                page,
                fetched = channels.len(),
                "fetching next conversations page"
            );
        }

        Ok(channels)
    }

    async fn post_message(&self, request: &PostMessageRequest) -> Result<(), SlackApiError> {
        let _: Ignored = self.call("chat.postMessage", Body::Json(request)).await?;
        Ok(())
    }

    async fn unfurl(&self, request: &UnfurlRequest) -> Result<(), SlackApiError> {
        let _: Ignored = self.call("chat.unfurl", Body::Json(request)).await?;
        Ok(())
    }
}

/// In-memory [`SlackApi`] that records outbound calls. Channels listed in
/// `failing_channels` reject `post_message` with an API error.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct RecordingSlackApi {
    channels: Vec<Channel>,
    failing_channels: Vec<String>,
    unfurl_error: Option<SlackApiError>,
    state: Mutex<RecordedCalls>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Debug, Default)]
pub struct RecordedCalls {
    pub messages: Vec<PostMessageRequest>,
    pub unfurls: Vec<UnfurlRequest>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingSlackApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.channels.push(Channel { id: id.into(), name: name.into() });
        self
    }

    pub fn failing_channel(mut self, id: impl Into<String>) -> Self {
        self.failing_channels.push(id.into());
        self
    }

    pub fn failing_unfurl(mut self, error: SlackApiError) -> Self {
        self.unfurl_error = Some(error);
        self
    }

    pub async fn calls(&self) -> RecordedCalls {
        self.state.lock().await.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl SlackApi for RecordingSlackApi {
    async fn auth_test(&self) -> Result<AuthIdentity, SlackApiError> {
        Ok(AuthIdentity {
            team: "test-team".to_owned(),
            user: "dashshare".to_owned(),
            ..AuthIdentity::default()
        })
    }

    async fn list_conversations(&self) -> Result<Vec<Channel>, SlackApiError> {
        Ok(self.channels.clone())
    }

    async fn post_message(&self, request: &PostMessageRequest) -> Result<(), SlackApiError> {
        self.state.lock().await.messages.push(request.clone());
        if self.failing_channels.contains(&request.channel) {
            return Err(SlackApiError::Api {
                method: "chat.postMessage",
                error: "channel_not_found".to_owned(),
            });
        }
        Ok(())
    }

    async fn unfurl(&self, request: &UnfurlRequest) -> Result<(), SlackApiError> {
        self.state.lock().await.unfurls.push(request.clone());
        match &self.unfurl_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
