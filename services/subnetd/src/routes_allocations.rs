use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::registry::{TaskId, TaskState};
use crate::runner;
use crate::state::SharedState;
use crate::types::{ErrorBody, SubmitRequest, SubmitResponse};

/// Validate a request and start the allocation in the background.
/// Pre-flight failures reject synchronously; nothing is registered for
/// them.
pub async fn submit_allocation(
    State(state): State<SharedState>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), (StatusCode, Json<ErrorBody>)> {
    let request = req
        .into_allocation()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorBody::new(e.to_string()))))?;

    let task_id = state.tasks.create().await;
    info!(task_id = %task_id, "allocation submitted");
    runner::spawn_allocation(state.clone(), task_id.clone(), request);

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            status: "started",
            task_id: task_id.to_string(),
        }),
    ))
}

/// Latest snapshot for a task. Never blocks on the running allocation;
/// unknown identifiers return the not-yet-started shape.
pub async fn poll_allocation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<TaskState> {
    Json(state.tasks.snapshot(&TaskId::from(id)).await)
}

pub async fn healthz() -> &'static str {
    "ok"
}
