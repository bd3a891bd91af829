//! APK version API endpoints.

use axum::extract::{Path, State};

use super::{success_list, ApiResponse, ApiResult, FlatResponse, JsonOrForm};
use crate::errors::AppError;
use crate::models::{ApkVersion, CreateApkVersionRequest, LatestApkVersion};
use crate::FeedbackState;

/// GET /api/apk/version - The version currently advertised to clients.
///
/// The version fields sit at the top level of the response.
pub async fn latest_apk_version(
    State(state): State<FeedbackState>,
) -> Result<FlatResponse<LatestApkVersion>, AppError> {
    let version = state
        .repo
        .latest_active_apk_version()
        .await?
        .ok_or_else(|| AppError::NotFound("No active APK version".to_string()))?;

    Ok(FlatResponse::new(version.into()))
}

/// POST /admin/apk/add - Publish a version and make it the only active one.
pub async fn add_apk_version(
    State(state): State<FeedbackState>,
    JsonOrForm(request): JsonOrForm<CreateApkVersionRequest>,
) -> ApiResult<ApkVersion> {
    let new = request.validate()?;
    let version = state.repo.activate_apk_version(&new).await?;

    tracing::info!(
        id = version.id,
        version_code = %version.version_code,
        "APK version activated"
    );
    Ok(ApiResponse::new(version).with_message("APK version added"))
}

/// GET /admin/apk/list - All versions, newest first.
pub async fn list_apk_versions(State(state): State<FeedbackState>) -> ApiResult<Vec<ApkVersion>> {
    success_list(state.repo.list_apk_versions().await?)
}

/// POST /admin/apk/delete/:id - Delete a version record.
pub async fn delete_apk_version(
    State(state): State<FeedbackState>,
    Path(id): Path<i64>,
) -> ApiResult {
    state.repo.delete_apk_version(id).await?;

    tracing::info!(id, "APK version deleted");
    Ok(ApiResponse::message("APK version deleted"))
}
