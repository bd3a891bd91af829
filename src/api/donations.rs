//! Donation API endpoints.

use axum::extract::{Path, State};

use super::{success_list, ApiResponse, ApiResult, JsonOrForm};
use crate::models::{CreateDonationRequest, Donation};
use crate::FeedbackState;

/// Rows returned by the public donation list.
const PUBLIC_DONATION_LIMIT: i64 = 100;

/// POST /api/donation - Record a donation, replacing the device's earlier one.
pub async fn submit_donation(
    State(state): State<FeedbackState>,
    JsonOrForm(request): JsonOrForm<CreateDonationRequest>,
) -> ApiResult<Donation> {
    let new = request.validate()?;
    let donation = state.repo.record_donation(&new).await?;

    tracing::info!(
        id = donation.id,
        amount = donation.amount,
        device_id = donation.device_id.as_deref().unwrap_or("-"),
        "Donation recorded"
    );
    Ok(ApiResponse::new(donation).with_message("Donation recorded"))
}

/// GET /api/donations - The most recent donations.
pub async fn list_donations(State(state): State<FeedbackState>) -> ApiResult<Vec<Donation>> {
    success_list(
        state
            .repo
            .list_donations(Some(PUBLIC_DONATION_LIMIT))
            .await?,
    )
}

/// GET /admin/donations/list - Every donation.
pub async fn admin_list_donations(State(state): State<FeedbackState>) -> ApiResult<Vec<Donation>> {
    success_list(state.repo.list_donations(None).await?)
}

/// POST /admin/donations/delete/:id - Delete a donation.
pub async fn delete_donation(
    State(state): State<FeedbackState>,
    Path(id): Path<i64>,
) -> ApiResult {
    state.repo.delete_donation(id).await?;

    tracing::info!(id, "Donation deleted");
    Ok(ApiResponse::message("Donation deleted"))
}
