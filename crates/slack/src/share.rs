use std::sync::Arc;

use dashshare_core::config::PublicUrlConfig;
use dashshare_core::dashboard::{DashboardError, DashboardService, DashboardUid};
use dashshare_core::errors::ApplicationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::blocks::dashboard_share_message;
use crate::client::{PostMessageRequest, SlackApi};

/// Share request sent by the dashboard UI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default)]
    pub channel_ids: Vec<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub image_preview_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_id: Option<String>,
    #[serde(default)]
    pub dashboard_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel_id: String,
    pub error: String,
}

/// Per-channel outcome of a share. Channel failures do not fail the share.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShareReport {
    pub delivered: Vec<String>,
    pub failed: Vec<ChannelFailure>,
}

impl ShareReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
}

impl From<ShareError> for ApplicationError {
    fn from(error: ShareError) -> Self {
        match error {
            ShareError::Dashboard(error) => Self::Dashboard(error),
        }
    }
}

pub struct ShareService {
    slack: Arc<dyn SlackApi>,
    dashboards: Arc<dyn DashboardService>,
    public_url: PublicUrlConfig,
}

impl ShareService {
    pub fn new(
        slack: Arc<dyn SlackApi>,
        dashboards: Arc<dyn DashboardService>,
        public_url: PublicUrlConfig,
    ) -> Self {
        Self { slack, dashboards, public_url }
    }

    /// Posts the dashboard card to every requested channel, one after the
    /// other. Only the dashboard lookup can fail the call.
    pub async fn share(
        &self,
        uid: &DashboardUid,
        request: &ShareRequest,
        correlation_id: &str,
    ) -> Result<ShareReport, ShareError> {
        let dashboard = self.dashboards.get_dashboard(uid).await?;
        let dashboard_link = self.public_url.dashboard_link(&request.dashboard_path);
        let message = dashboard_share_message(
            &dashboard.title,
            &dashboard_link,
            &request.message,
            &request.image_preview_url,
        );

        let mut report = ShareReport::default();
        for channel_id in &request.channel_ids {
            let post = PostMessageRequest::new(channel_id.clone(), &message);
            match self.slack.post_message(&post).await {
                Ok(()) => report.delivered.push(channel_id.clone()),
                Err(error) => {
                    warn!(
                        event_name = "slack.share.channel_failed",
                        correlation_id = %correlation_id,
                        dashboard_uid = %uid,
                        channel_id = %channel_id,
                        error = %error,
                        "failed to share dashboard to channel"
                    );
                    report.failed.push(ChannelFailure {
                        channel_id: channel_id.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        if report.failed.is_empty() {
            info!(
                event_name = "slack.share.completed",
                correlation_id = %correlation_id,
                dashboard_uid = %uid,
                delivered = report.delivered.len(),
                "shared dashboard to slack"
            );
        } else {
            warn!(
                event_name = "slack.share.partial",
                correlation_id = %correlation_id,
                dashboard_uid = %uid,
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "shared dashboard with channel failures"
            );
        }

        Ok(report)
    }
}
