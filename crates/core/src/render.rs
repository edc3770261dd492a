use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
#[cfg(any(test, feature = "test-support"))]
use tokio::sync::Mutex;

use crate::config::{PublicUrlConfig, RenderingConfig};
use crate::links::extract_url_info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OrgRole {
    Viewer,
    Editor,
    Admin,
}

impl OrgRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "Viewer",
            Self::Editor => "Editor",
            Self::Admin => "Admin",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub timeout: Duration,
    pub device_scale_factor: f64,
    pub theme: Theme,
    pub org_id: i64,
    pub org_role: OrgRole,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderResult {
    pub file_path: PathBuf,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("rendering timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("renderer request failed: {0}")]
    Request(String),
    #[error("renderer returned status {status}")]
    Status { status: u16 },
    #[error("could not store rendered image: {0}")]
    Storage(String),
}

/// External service that turns a Grafana route into a PNG on disk.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, options: &RenderOptions) -> Result<RenderResult, RenderError>;
}

/// Fixed render settings used for Slack previews: configured viewport and
/// timeout, dark theme, admin role. The org comes from the shared link when
/// it carries one.
pub fn dashboard_render_options(
    render_path: &str,
    org_id: Option<i64>,
    rendering: &RenderingConfig,
) -> RenderOptions {
    RenderOptions {
        path: render_path.to_owned(),
        width: rendering.width,
        height: rendering.height,
        timeout: Duration::from_secs(rendering.timeout_secs),
        device_scale_factor: rendering.device_scale_factor,
        theme: Theme::Dark,
        org_id: org_id.unwrap_or(rendering.default_org_id),
        org_role: OrgRole::Admin,
    }
}

pub async fn render_dashboard(
    renderer: &dyn Renderer,
    rendering: &RenderingConfig,
    render_path: &str,
    org_id: Option<i64>,
) -> Result<PathBuf, RenderError> {
    let options = dashboard_render_options(render_path, org_id, rendering);
    let result = renderer.render(&options).await?;
    Ok(result.file_path)
}

/// Renders a dashboard URL and returns the public URL of the image. URLs
/// that do not match a `/d/<uid>/` route are rendered as given.
pub async fn render_preview_url(
    renderer: &dyn Renderer,
    rendering: &RenderingConfig,
    public_url: &PublicUrlConfig,
    dashboard_url: &str,
) -> Result<String, RenderError> {
    let (render_path, org_id) = match extract_url_info(dashboard_url) {
        Some(link) => (link.render_path, link.org_id),
        None => (dashboard_url.to_owned(), None),
    };

    let file_path = render_dashboard(renderer, rendering, &render_path, org_id).await?;
    public_url.image_url_for_file(&file_path).ok_or_else(|| {
        RenderError::Storage(format!("rendered file `{}` has no name", file_path.display()))
    })
}

/// Base name of a rendered file, used as the public image name.
pub fn image_file_name(file_path: &Path) -> Option<&str> {
    file_path.file_name().and_then(|name| name.to_str())
}

/// Renderer that returns a canned outcome and records every request.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug)]
pub struct StaticRenderer {
    outcome: Result<PathBuf, RenderError>,
    requests: Mutex<Vec<RenderOptions>>,
}

#[cfg(any(test, feature = "test-support"))]
impl StaticRenderer {
    pub fn succeeding(file_path: impl Into<PathBuf>) -> Self {
        Self { outcome: Ok(file_path.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn failing(error: RenderError) -> Self {
        Self { outcome: Err(error), requests: Mutex::new(Vec::new()) }
    }

    pub async fn requests(&self) -> Vec<RenderOptions> {
        self.requests.lock().await.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self, options: &RenderOptions) -> Result<RenderResult, RenderError> {
        self.requests.lock().await.push(options.clone());
        self.outcome.clone().map(|file_path| RenderResult { file_path })
    }
}
