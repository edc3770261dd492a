use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashshare_core::config::{PublicUrlConfig, RenderingConfig};
use dashshare_core::dashboard::DashboardUid;
use dashshare_core::errors::{ApplicationError, InterfaceError};
use dashshare_core::public_url::ATTACHMENTS_ROUTE;
use dashshare_core::render::{render_preview_url, Renderer};
use dashshare_slack::client::{Channel, SlackApi};
use dashshare_slack::events::{DispatchOutcome, EventContext, EventDispatcher};
use dashshare_slack::share::{ShareRequest, ShareService};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub slack: Arc<dyn SlackApi>,
    pub share: Arc<ShareService>,
    pub dispatcher: EventDispatcher,
    pub renderer: Arc<dyn Renderer>,
    pub rendering: RenderingConfig,
    pub public_url: PublicUrlConfig,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeAck {
    pub challenge: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(rename = "dashboardUrl", default)]
    pub dashboard_url: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    #[serde(rename = "previewUrl")]
    pub preview_url: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn new(error: impl Into<ApplicationError>, correlation_id: &str) -> Self {
        let interface = error.into().into_interface(correlation_id);
        match &interface {
            InterfaceError::Internal { message, .. } => error!(
                event_name = "http.request.failed",
                correlation_id = %correlation_id,
                error = %message,
                "request failed"
            ),
            InterfaceError::BadRequest { message, .. } | InterfaceError::NotFound { message, .. } => {
                warn!(
                    event_name = "http.request.rejected",
                    correlation_id = %correlation_id,
                    error = %message,
                    "request rejected"
                )
            }
        }
        Self(interface)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
            InterfaceError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.clone()),
            InterfaceError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.user_message().to_owned())
            }
        };
        let body = ErrorBody { error, correlation_id: self.0.correlation_id().to_owned() };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/slack/channels", get(list_channels))
        .route("/dashboards/{uid}/share", post(share_dashboard))
        .route("/slack/events", post(slack_events))
        .route("/render/preview", post(render_preview))
        .with_state(state)
}

/// Serves rendered images so composed image URLs resolve, under the sub
/// path too when the deployment is served from one.
pub fn attachments(images_dir: &FsPath, public_url: &PublicUrlConfig) -> Router {
    let route = format!("/{ATTACHMENTS_ROUTE}");
    let mut router = Router::new().nest_service(&route, ServeDir::new(images_dir));

    let sub_path = public_url.app_sub_url.trim_end_matches('/');
    if public_url.serve_from_sub_path && !sub_path.is_empty() {
        router = router.nest_service(&format!("{sub_path}{route}"), ServeDir::new(images_dir));
    }
    router
}

fn correlation_id() -> String {
    format!("req-{}", Uuid::new_v4())
}

async fn list_channels(State(state): State<AppState>) -> Result<Json<Vec<Channel>>, ApiError> {
    let correlation_id = correlation_id();
    let channels = state.slack.list_conversations().await.map_err(|error| {
        ApiError::new(ApplicationError::Integration(error.to_string()), &correlation_id)
    })?;

    info!(
        event_name = "http.slack_channels.listed",
        correlation_id = %correlation_id,
        channels = channels.len(),
        "listed slack channels"
    );
    Ok(Json(channels))
}

async fn share_dashboard(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    payload: Result<Json<ShareRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let correlation_id = correlation_id();
    let Json(request) = payload.map_err(|rejection| {
        ApiError::new(ApplicationError::MalformedRequest(rejection.body_text()), &correlation_id)
    })?;

    let report = state
        .share
        .share(&DashboardUid::new(uid), &request, &correlation_id)
        .await
        .map_err(|error| ApiError::new(error, &correlation_id))?;

    info!(
        event_name = "http.dashboard_share.completed",
        correlation_id = %correlation_id,
        attempted = report.attempted(),
        failed = report.failed.len(),
        "dashboard share request handled"
    );
    Ok(StatusCode::OK)
}

async fn slack_events(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let ctx = EventContext { correlation_id: correlation_id() };
    let outcome = state
        .dispatcher
        .dispatch_raw(&body, &ctx)
        .map_err(|error| ApiError::new(error, &ctx.correlation_id))?;

    Ok(match outcome {
        DispatchOutcome::Challenge(challenge) => Json(ChallengeAck { challenge }).into_response(),
        DispatchOutcome::Scheduled => StatusCode::OK.into_response(),
    })
}

async fn render_preview(
    State(state): State<AppState>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let correlation_id = correlation_id();
    let Json(request) = payload.map_err(|rejection| {
        ApiError::new(ApplicationError::MalformedRequest(rejection.body_text()), &correlation_id)
    })?;
    if request.dashboard_url.trim().is_empty() {
        return Err(ApiError::new(
            ApplicationError::MalformedRequest("dashboardUrl is required".to_owned()),
            &correlation_id,
        ));
    }

    info!(
        event_name = "http.render_preview.start",
        correlation_id = %correlation_id,
        dashboard_url = %request.dashboard_url,
        "generating preview"
    );
    let preview_url = render_preview_url(
        state.renderer.as_ref(),
        &state.rendering,
        &state.public_url,
        &request.dashboard_url,
    )
    .await
    .map_err(|error| ApiError::new(error, &correlation_id))?;

    Ok(Json(PreviewResponse { preview_url }))
}
