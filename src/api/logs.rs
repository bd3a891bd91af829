//! Operation log API endpoints (admin only).

use axum::extract::{Path, State};

use super::{success_list, ApiResponse, ApiResult, JsonOrForm};
use crate::models::{LogForm, OperationLog};
use crate::UsageState;

/// GET /admin/logs - All logs, newest first.
pub async fn list_logs(State(state): State<UsageState>) -> ApiResult<Vec<OperationLog>> {
    success_list(state.repo.list_logs(None).await?)
}

/// POST /admin/logs/add - Create a log entry.
pub async fn add_log(
    State(state): State<UsageState>,
    JsonOrForm(form): JsonOrForm<LogForm>,
) -> ApiResult<OperationLog> {
    let new = form.validate()?;
    let log = state.repo.create_log(&new).await?;

    tracing::info!(id = log.id, device_id = %log.device_id, "Log added");
    Ok(ApiResponse::new(log).with_message("Log added"))
}

/// POST /admin/logs/edit/:id - Rewrite a log entry.
pub async fn edit_log(
    State(state): State<UsageState>,
    Path(id): Path<i64>,
    JsonOrForm(form): JsonOrForm<LogForm>,
) -> ApiResult<OperationLog> {
    let new = form.validate()?;
    let log = state.repo.update_log(id, &new).await?;

    tracing::info!(id, "Log edited");
    Ok(ApiResponse::new(log).with_message("Log updated"))
}

/// POST /admin/logs/delete/:id
pub async fn delete_log(State(state): State<UsageState>, Path(id): Path<i64>) -> ApiResult {
    state.repo.delete_log(id).await?;

    tracing::info!(id, "Log deleted");
    Ok(ApiResponse::message("Log deleted"))
}
