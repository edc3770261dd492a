use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashshare_core::config::{AppConfig, RenderingConfig};
use dashshare_core::render::{RenderError, RenderOptions, RenderResult, Renderer};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Client for a remote image renderer exposing `GET /render`.
///
/// The Grafana credential is handed to the renderer as its `renderKey`, scoped
/// to the Grafana host through `domain`, so the headless browser loads the
/// dashboard as the requested org and role instead of hitting the login page.
pub struct HttpRenderer {
    http: reqwest::Client,
    renderer_url: String,
    grafana_url: String,
    grafana_domain: Option<String>,
    renderer_token: Option<SecretString>,
    grafana_token: Option<SecretString>,
    images_dir: PathBuf,
    limiter: Arc<Semaphore>,
}

impl HttpRenderer {
    /// `grafana_url` is the address the renderer loads dashboards from.
    pub fn new(
        rendering: &RenderingConfig,
        grafana_url: impl Into<String>,
        grafana_token: Option<SecretString>,
    ) -> Result<Self, RenderError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|error| RenderError::Request(error.to_string()))?;
        let grafana_url = grafana_url.into().trim_end_matches('/').to_owned();
        let grafana_domain = Url::parse(&grafana_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned));

        Ok(Self {
            http,
            renderer_url: rendering.renderer_url.trim_end_matches('/').to_owned(),
            grafana_url,
            grafana_domain,
            renderer_token: rendering.renderer_token.clone(),
            grafana_token,
            images_dir: rendering.images_dir.clone(),
            limiter: Arc::new(Semaphore::new(rendering.concurrent_request_limit.max(1))),
        })
    }

    /// Uses the renderer callback URL when configured, the Grafana URL
    /// otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self, RenderError> {
        let grafana_url = config
            .public_url
            .renderer_callback_url
            .clone()
            .unwrap_or_else(|| config.grafana.url.clone());
        if config.grafana.api_token.is_none() {
            warn!(
                event_name = "render.auth.missing",
                correlation_id = "bootstrap",
                grafana_url = %grafana_url,
                "grafana.api_token is unset; dashboards render only with anonymous access"
            );
        }
        Self::new(&config.rendering, grafana_url, config.grafana.api_token.clone())
    }

    fn page_url(&self, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        let path = if path.starts_with('/') { path.to_owned() } else { format!("/{path}") };
        format!("{}{path}{separator}render=1", self.grafana_url)
    }

    async fn fetch(&self, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let query = [
            ("url", self.page_url(&options.path)),
            ("width", options.width.to_string()),
            ("height", options.height.to_string()),
            ("deviceScaleFactor", options.device_scale_factor.to_string()),
            ("timeout", options.timeout.as_secs().to_string()),
            ("theme", options.theme.as_str().to_owned()),
            ("orgId", options.org_id.to_string()),
            ("orgRole", options.org_role.as_str().to_owned()),
        ];

        let mut request = self.http.get(format!("{}/render", self.renderer_url)).query(&query);
        if let Some(domain) = &self.grafana_domain {
            request = request.query(&[("domain", domain)]);
        }
        if let Some(key) = &self.grafana_token {
            request = request.query(&[("renderKey", key.expose_secret())]);
        }
        if let Some(token) = &self.renderer_token {
            request = request.header(AUTH_TOKEN_HEADER, token.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| RenderError::Request(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status { status: status.as_u16() });
        }

        let body =
            response.bytes().await.map_err(|error| RenderError::Request(error.to_string()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, options: &RenderOptions) -> Result<RenderResult, RenderError> {
        // The deadline covers waiting for a slot as well as the render itself.
        let queued_fetch = async {
            let _permit = self
                .limiter
                .acquire()
                .await
                .map_err(|error| RenderError::Request(error.to_string()))?;
            self.fetch(options).await
        };

        let timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX);
        let image = tokio::time::timeout(options.timeout, queued_fetch)
            .await
            .map_err(|_| RenderError::Timeout { timeout_ms })??;

        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .map_err(|error| RenderError::Storage(error.to_string()))?;
        let file_path = self.images_dir.join(format!("{}.png", Uuid::new_v4().simple()));
        tokio::fs::write(&file_path, &image)
            .await
            .map_err(|error| RenderError::Storage(error.to_string()))?;

        debug!(
            event_name = "render.image.stored",
            path = %options.path,
            org_id = options.org_id,
            file = %file_path.display(),
            bytes = image.len(),
            "stored rendered dashboard image"
        );
        Ok(RenderResult { file_path })
    }
}
