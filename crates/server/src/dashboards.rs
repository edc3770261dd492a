use std::time::Duration;

use async_trait::async_trait;
use dashshare_core::config::GrafanaConfig;
use dashshare_core::dashboard::{Dashboard, DashboardError, DashboardService, DashboardUid};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

/// Dashboard lookup against the Grafana HTTP API.
pub struct GrafanaDashboardService {
    http: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

#[derive(Deserialize)]
struct DashboardEnvelope {
    dashboard: DashboardModel,
}

#[derive(Deserialize)]
struct DashboardModel {
    #[serde(default)]
    title: String,
}

impl GrafanaDashboardService {
    pub fn new(config: &GrafanaConfig) -> Result<Self, DashboardError> {
        let base_url = Url::parse(&config.url).map_err(|error| {
            DashboardError::Unavailable(format!("invalid grafana url `{}`: {error}", config.url))
        })?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| DashboardError::Unavailable(error.to_string()))?;

        Ok(Self { http, base_url, api_token: config.api_token.clone() })
    }

    fn dashboard_url(&self, uid: &DashboardUid) -> Result<Url, DashboardError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DashboardError::Unavailable(format!(
                    "grafana url `{}` cannot be a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "dashboards", "uid", uid.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl DashboardService for GrafanaDashboardService {
    async fn get_dashboard(&self, uid: &DashboardUid) -> Result<Dashboard, DashboardError> {
        let mut request = self.http.get(self.dashboard_url(uid)?);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| DashboardError::Unavailable(error.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(DashboardError::NotFound(uid.to_string())),
            status if !status.is_success() => {
                return Err(DashboardError::Unavailable(format!(
                    "grafana returned status {status} for dashboard `{uid}`"
                )));
            }
            _ => {}
        }

        let envelope: DashboardEnvelope = response
            .json()
            .await
            .map_err(|error| DashboardError::Unavailable(error.to_string()))?;

        Ok(Dashboard { uid: uid.clone(), title: envelope.dashboard.title })
    }
}
