//! User profile API endpoints, public telemetry and the admin dashboard.

use axum::extract::{Path, State};

use super::{success, success_list, ApiResponse, ApiResult, FlatResponse, JsonOrForm};
use crate::errors::AppError;
use crate::models::{
    DashboardStats, Leaderboard, ProfileForm, RegisterRequest, RegistrationOutcome,
    UpdateProfileRequest, UserProfile,
};
use crate::UsageState;

/// GET /api/user/:device_id - Get a device's profile.
pub async fn get_user(
    State(state): State<UsageState>,
    Path(device_id): Path<String>,
) -> ApiResult<UserProfile> {
    let profile = state
        .repo
        .get_profile_by_device(&device_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", device_id)))?;

    success(profile)
}

/// POST /api/user/register - Upsert a telemetry report.
///
/// `user_type` and `time` are returned at the top level.
pub async fn register_user(
    State(state): State<UsageState>,
    JsonOrForm(request): JsonOrForm<RegisterRequest>,
) -> Result<FlatResponse<RegistrationOutcome>, AppError> {
    let report = request.validate()?;
    let outcome = state.repo.register_telemetry(&report).await?;

    tracing::info!(
        device_id = %report.device_id,
        time = outcome.time,
        "Telemetry registered"
    );
    let message = if outcome.is_first_registration() {
        "New user registered"
    } else {
        "User info updated"
    };
    Ok(FlatResponse::new(outcome).with_message(message))
}

/// POST /api/user/update - Partially update a device's profile.
pub async fn update_user(
    State(state): State<UsageState>,
    JsonOrForm(request): JsonOrForm<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    let (device_id, changes) = request.validate()?;
    let profile = state
        .repo
        .update_profile_by_device(&device_id, &changes)
        .await?;

    tracing::info!(device_id = %device_id, "Profile updated");
    Ok(ApiResponse::new(profile).with_message("Profile updated"))
}

/// GET /api/leaderboard - Profiles ranked by duration, distance and count.
pub async fn leaderboard(State(state): State<UsageState>) -> ApiResult<Leaderboard> {
    success(state.repo.leaderboard().await?)
}

/// GET /admin - Dashboard counts and recent activity.
pub async fn dashboard(State(state): State<UsageState>) -> ApiResult<DashboardStats> {
    success(state.repo.dashboard_stats().await?)
}

/// GET /admin/users - All profiles, most recently modified first.
pub async fn admin_list_users(State(state): State<UsageState>) -> ApiResult<Vec<UserProfile>> {
    success_list(state.repo.list_profiles().await?)
}

/// POST /admin/users/add - Create a profile.
pub async fn admin_add_user(
    State(state): State<UsageState>,
    JsonOrForm(form): JsonOrForm<ProfileForm>,
) -> ApiResult<UserProfile> {
    let record = form.validate()?;
    let profile = state.repo.create_profile(&record).await?;

    tracing::info!(id = profile.id, device_id = %profile.device_id, "User added");
    Ok(ApiResponse::new(profile).with_message("User added"))
}

/// POST /admin/users/edit/:id - Overwrite a profile.
pub async fn admin_edit_user(
    State(state): State<UsageState>,
    Path(id): Path<i64>,
    JsonOrForm(form): JsonOrForm<ProfileForm>,
) -> ApiResult<UserProfile> {
    let record = form.validate()?;
    let profile = state.repo.update_profile(id, &record).await?;

    tracing::info!(id, "User edited");
    Ok(ApiResponse::new(profile).with_message("User updated"))
}

/// POST /admin/users/delete/:id - Delete a profile.
pub async fn admin_delete_user(State(state): State<UsageState>, Path(id): Path<i64>) -> ApiResult {
    state.repo.delete_profile(id).await?;

    tracing::info!(id, "User deleted");
    Ok(ApiResponse::message("User deleted"))
}
