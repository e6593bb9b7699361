//! One background unit of execution per submitted allocation.
//!
//! The engine runs under `spawn_blocking` and streams steps over a
//! channel; the async side owns every registry write, applies the
//! pacing delay, and turns engine failures or panics into a terminal
//! error on the task instead of letting them escape.

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use netcalc::{AllocationRequest, allocate};

use crate::registry::TaskId;
use crate::state::SharedState;

pub fn spawn_allocation(state: SharedState, task_id: TaskId, request: AllocationRequest) {
    tokio::spawn(run_allocation(state, task_id, request));
}

pub async fn run_allocation(state: SharedState, task_id: TaskId, request: AllocationRequest) {
    let pace = state.cfg.pace;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let engine = tokio::task::spawn_blocking(move || {
        allocate(&request, |step| {
            // receiver only goes away if the runner died; nothing left
            // to report to in that case
            let _ = tx.send(step);
        })
    });

    while let Some(step) = rx.recv().await {
        state
            .tasks
            .record_step(&task_id, step.result, step.progress)
            .await;
        if !pace.is_zero() {
            sleep(pace).await;
        }
    }

    // channel closed: the engine is done, one way or another
    match engine.await {
        Ok(Ok(())) => {
            state.tasks.complete(&task_id).await;
            info!(task_id = %task_id, "allocation complete");
        }
        Ok(Err(err)) => {
            warn!(task_id = %task_id, "allocation failed: {err}");
            state.tasks.fail(&task_id, err.to_string()).await;
        }
        Err(join_err) => {
            error!(task_id = %task_id, "allocation panicked: {join_err}");
            state
                .tasks
                .fail(&task_id, "Internal error during allocation")
                .await;
        }
    }
}
