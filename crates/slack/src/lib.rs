//! Slack integration for dashboard sharing
//!
//! This crate provides the Slack side of dashshare:
//! - **Events** (`events`) - Events API payloads, URL verification, link_shared dispatch
//! - **Unfurl** (`unfurl`) - Renders a shared dashboard link into a preview card
//! - **Share** (`share`) - Posts a dashboard card to channels picked in the UI
//! - **Block Kit** (`blocks`) - Message layout builders
//! - **Client** (`client`) - Slack Web API calls
//! - **Tasks** (`tasks`) - Supervisor for work that outlives the HTTP request
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Add the `channels:read`, `chat:write` and `links:write` bot scopes
//! 3. Subscribe to the `link_shared` event and register your Grafana domain
//! 4. Point the Events API request URL at `/slack/events`
//! 5. Set `DASHSHARE_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → TaskSupervisor → UnfurlOrchestrator → chat.unfurl
//! Grafana UI   → ShareService ──────────────────────────────────────────→ chat.postMessage
//! ```

pub mod blocks;
pub mod client;
pub mod events;
pub mod share;
pub mod tasks;
pub mod unfurl;
