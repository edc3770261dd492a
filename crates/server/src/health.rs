use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use dashshare_slack::tasks::TaskSupervisor;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    tasks: TaskSupervisor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub background_tasks: usize,
    pub checked_at: String,
}

pub fn router(tasks: TaskSupervisor) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { tasks })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: "dashshare-server",
        background_tasks: state.tasks.in_flight(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
