use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashshare_core::config::{PublicUrlConfig, RenderingConfig};
use dashshare_core::dashboard::{DashboardError, DashboardService};
use dashshare_core::links::extract_url_info;
use dashshare_core::render::{render_dashboard, RenderError, Renderer};
use thiserror::Error;
use tracing::info;

use crate::blocks::dashboard_unfurl_message;
use crate::client::{SlackApi, SlackApiError, Unfurl, UnfurlRequest};
use crate::events::{EventContext, EventHandlerError, LinkSharedEvent, LinkSharedHandler};

#[derive(Debug, Error)]
pub enum UnfurlError {
    #[error("shared link does not point at a dashboard")]
    NoDashboardLink,
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("rendered image `{0}` has no file name")]
    ImageName(String),
    #[error(transparent)]
    Slack(#[from] SlackApiError),
}

/// Turns a shared dashboard link into a Slack preview card: resolve the
/// dashboard, render it, and attach the card to the shared message.
///
/// Only the first link is rendered; every link in the event receives the
/// resulting card.
pub struct UnfurlOrchestrator {
    slack: Arc<dyn SlackApi>,
    dashboards: Arc<dyn DashboardService>,
    renderer: Arc<dyn Renderer>,
    rendering: RenderingConfig,
    public_url: PublicUrlConfig,
}

impl UnfurlOrchestrator {
    pub fn new(
        slack: Arc<dyn SlackApi>,
        dashboards: Arc<dyn DashboardService>,
        renderer: Arc<dyn Renderer>,
        rendering: RenderingConfig,
        public_url: PublicUrlConfig,
    ) -> Self {
        Self { slack, dashboards, renderer, rendering, public_url }
    }

    pub async fn unfurl(
        &self,
        event: &LinkSharedEvent,
        ctx: &EventContext,
    ) -> Result<UnfurlRequest, UnfurlError> {
        let link = event
            .links
            .first()
            .and_then(|link| extract_url_info(&link.url))
            .ok_or(UnfurlError::NoDashboardLink)?;

        let dashboard = self.dashboards.get_dashboard(&link.uid).await?;
        let image_path =
            render_dashboard(self.renderer.as_ref(), &self.rendering, &link.render_path, link.org_id)
                .await?;
        let image_url = self
            .public_url
            .image_url_for_file(&image_path)
            .ok_or_else(|| UnfurlError::ImageName(image_path.display().to_string()))?;

        let unfurls = event
            .links
            .iter()
            .map(|shared| {
                let message = dashboard_unfurl_message(&dashboard.title, &shared.url, &image_url);
                (shared.url.clone(), Unfurl { blocks: message.blocks })
            })
            .collect::<BTreeMap<_, _>>();

        let request = UnfurlRequest {
            channel: event.channel.clone(),
            ts: event.message_ts.clone(),
            unfurls,
        };
        self.slack.unfurl(&request).await?;

        info!(
            event_name = "slack.unfurl.posted",
            correlation_id = %ctx.correlation_id,
            dashboard_uid = %dashboard.uid,
            channel = %request.channel,
            image_url = %image_url,
            "posted dashboard unfurl"
        );
        Ok(request)
    }
}

#[async_trait]
impl LinkSharedHandler for UnfurlOrchestrator {
    async fn handle(
        &self,
        event: &LinkSharedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        self.unfurl(event, ctx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dashshare_core::config::AppConfig;
    use dashshare_core::dashboard::InMemoryDashboardService;
    use dashshare_core::render::{RenderError, StaticRenderer};

    use super::{UnfurlError, UnfurlOrchestrator};
    use crate::blocks::{Block, TextObject};
    use crate::client::{RecordingSlackApi, SlackApiError};
    use crate::events::{EventContext, Link, LinkSharedEvent};

    struct Harness {
        slack: Arc<RecordingSlackApi>,
        renderer: Arc<StaticRenderer>,
        orchestrator: UnfurlOrchestrator,
    }

    fn harness(
        slack: RecordingSlackApi,
        dashboards: InMemoryDashboardService,
        renderer: StaticRenderer,
    ) -> Harness {
        let config = AppConfig::default();
        let slack = Arc::new(slack);
        let renderer = Arc::new(renderer);
        let orchestrator = UnfurlOrchestrator::new(
            slack.clone(),
            Arc::new(dashboards),
            renderer.clone(),
            config.rendering,
            config.public_url,
        );
        Harness { slack, renderer, orchestrator }
    }

    fn event(urls: &[&str]) -> LinkSharedEvent {
        LinkSharedEvent {
            event_id: "Ev1".to_owned(),
            channel: "C1".to_owned(),
            message_ts: "1700000000.000100".to_owned(),
            user: "U1".to_owned(),
            links: urls
                .iter()
                .map(|url| Link { url: (*url).to_owned(), domain: "grafana.example.com".to_owned() })
                .collect(),
        }
    }

    #[tokio::test]
    async fn unfurls_shared_dashboard_link() {
        let h = harness(
            RecordingSlackApi::new(),
            InMemoryDashboardService::new().with_dashboard("abc", "Cluster Overview"),
            StaticRenderer::succeeding("/var/lib/dashshare/png/r4nd0m.png"),
        );
        let url = "https://grafana.example.com/d/abc/cluster?orgId=3";

        let request =
            h.orchestrator.unfurl(&event(&[url]), &EventContext::default()).await.expect("unfurl");

        assert_eq!(request.channel, "C1");
        assert_eq!(request.ts, "1700000000.000100");
        let blocks = &request.unfurls[url].blocks;
        assert!(matches!(
            &blocks[0],
            Block::Header { text: TextObject::Plain { text }, .. } if text == "Cluster Overview"
        ));
        assert!(matches!(
            &blocks[2],
            Block::Image { image_url, .. }
                if image_url == "http://localhost:3000/public/img/attachments/r4nd0m.png"
        ));

        let render_requests = h.renderer.requests().await;
        assert_eq!(render_requests.len(), 1);
        assert_eq!(render_requests[0].path, "/d/abc/cluster?orgId=3");
        assert_eq!(render_requests[0].org_id, 3);
        assert_eq!(h.slack.calls().await.unfurls, vec![request]);
    }

    #[tokio::test]
    async fn every_link_receives_the_first_links_card() {
        let h = harness(
            RecordingSlackApi::new(),
            InMemoryDashboardService::new().with_dashboard("abc", "Cluster"),
            StaticRenderer::succeeding("/tmp/abc.png"),
        );
        let first = "https://grafana.example.com/d/abc/cluster";
        let second = "https://grafana.example.com/d/other/latency";

        let request = h
            .orchestrator
            .unfurl(&event(&[first, second]), &EventContext::default())
            .await
            .expect("unfurl");

        assert_eq!(request.unfurls.len(), 2);
        assert_eq!(h.renderer.requests().await.len(), 1);
        assert!(request.unfurls.contains_key(second));
    }

    #[tokio::test]
    async fn non_dashboard_link_aborts_before_any_call() {
        let h = harness(
            RecordingSlackApi::new(),
            InMemoryDashboardService::new(),
            StaticRenderer::succeeding("/tmp/abc.png"),
        );

        let result = h
            .orchestrator
            .unfurl(&event(&["https://grafana.example.com/explore"]), &EventContext::default())
            .await;

        assert!(matches!(result, Err(UnfurlError::NoDashboardLink)));
        assert!(h.renderer.requests().await.is_empty());
        assert!(h.slack.calls().await.unfurls.is_empty());
    }

    #[tokio::test]
    async fn event_without_links_aborts() {
        let h = harness(
            RecordingSlackApi::new(),
            InMemoryDashboardService::new(),
            StaticRenderer::succeeding("/tmp/abc.png"),
        );

        let result = h.orchestrator.unfurl(&event(&[]), &EventContext::default()).await;

        assert!(matches!(result, Err(UnfurlError::NoDashboardLink)));
    }

    #[tokio::test]
    async fn unknown_dashboard_aborts_before_rendering() {
        let h = harness(
            RecordingSlackApi::new(),
            InMemoryDashboardService::new(),
            StaticRenderer::succeeding("/tmp/abc.png"),
        );

        let result = h
            .orchestrator
            .unfurl(&event(&["https://grafana.example.com/d/gone/x"]), &EventContext::default())
            .await;

        assert!(matches!(result, Err(UnfurlError::Dashboard(_))));
        assert!(h.renderer.requests().await.is_empty());
    }

    #[tokio::test]
    async fn render_failure_aborts_before_posting() {
        let h = harness(
            RecordingSlackApi::new(),
            InMemoryDashboardService::new().with_dashboard("abc", "Cluster"),
            StaticRenderer::failing(RenderError::Timeout { timeout_ms: 60_000 }),
        );

        let result = h
            .orchestrator
            .unfurl(&event(&["https://grafana.example.com/d/abc/x"]), &EventContext::default())
            .await;

        assert!(matches!(result, Err(UnfurlError::Render(RenderError::Timeout { .. }))));
        assert!(h.slack.calls().await.unfurls.is_empty());
    }

    #[tokio::test]
    async fn slack_rejection_is_reported() {
        let h = harness(
            RecordingSlackApi::new().failing_unfurl(SlackApiError::Api {
                method: "chat.unfurl",
                error: "cannot_unfurl_url".to_owned(),
            }),
            InMemoryDashboardService::new().with_dashboard("abc", "Cluster"),
            StaticRenderer::succeeding("/tmp/abc.png"),
        );

        let result = h
            .orchestrator
            .unfurl(&event(&["https://grafana.example.com/d/abc/x"]), &EventContext::default())
            .await;

        assert!(matches!(result, Err(UnfurlError::Slack(SlackApiError::Api { .. }))));
    }
}
