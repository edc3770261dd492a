use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use dashshare_core::config::{AppConfig, ConfigError, LoadOptions};
use dashshare_core::dashboard::{DashboardError, DashboardService};
use dashshare_core::render::{RenderError, Renderer};
use dashshare_slack::client::{HttpSlackClient, SlackApi, SlackApiError};
use dashshare_slack::events::EventDispatcher;
use dashshare_slack::share::ShareService;
use dashshare_slack::tasks::TaskSupervisor;
use dashshare_slack::unfurl::UnfurlOrchestrator;
use thiserror::Error;
use tracing::info;

use crate::dashboards::GrafanaDashboardService;
use crate::health;
use crate::renderer::HttpRenderer;
use crate::routes::{self, AppState};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
    pub tasks: TaskSupervisor,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client setup failed: {0}")]
    Slack(#[from] SlackApiError),
    #[error("grafana client setup failed: {0}")]
    Dashboards(#[from] DashboardError),
    #[error("renderer client setup failed: {0}")]
    Renderer(#[from] RenderError),
    #[error("could not create images directory `{path}`: {source}")]
    ImagesDir { path: PathBuf, source: std::io::Error },
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    tokio::fs::create_dir_all(&config.rendering.images_dir).await.map_err(|source| {
        BootstrapError::ImagesDir { path: config.rendering.images_dir.clone(), source }
    })?;

    let slack: Arc<dyn SlackApi> = Arc::new(HttpSlackClient::new(&config.slack)?);
    let dashboards: Arc<dyn DashboardService> =
        Arc::new(GrafanaDashboardService::new(&config.grafana)?);
    let renderer: Arc<dyn Renderer> = Arc::new(HttpRenderer::from_config(&config)?);
    info!(
        event_name = "system.bootstrap.clients_ready",
        correlation_id = "bootstrap",
        slack_api = %config.slack.api_base_url,
        grafana_url = %config.grafana.url,
        renderer_url = %config.rendering.renderer_url,
        "collaborator clients initialized"
    );

    let tasks = TaskSupervisor::new();
    let mut dispatcher = EventDispatcher::new(tasks.clone());
    dispatcher.register_link_shared(UnfurlOrchestrator::new(
        slack.clone(),
        dashboards.clone(),
        renderer.clone(),
        config.rendering.clone(),
        config.public_url.clone(),
    ));

    let state = AppState {
        slack: slack.clone(),
        share: Arc::new(ShareService::new(slack, dashboards, config.public_url.clone())),
        dispatcher,
        renderer,
        rendering: config.rendering.clone(),
        public_url: config.public_url.clone(),
    };

    Ok(Application { config, state, tasks })
}

impl Application {
    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
            .merge(health::router(self.tasks.clone()))
            .merge(routes::attachments(&self.config.rendering.images_dir, &self.config.public_url))
    }
}
