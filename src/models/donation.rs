//! Donation ledger model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::coerce_f64;
use crate::errors::AppError;

/// A donation record. At most one row exists per device id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub amount: f64,
    pub device_id: Option<String>,
    pub created_at: String,
}

/// Request body for recording a donation (JSON or form).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDonationRequest {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Validated donation.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub amount: f64,
    /// Trimmed, never empty
    pub device_id: Option<String>,
}

impl CreateDonationRequest {
    pub fn validate(self) -> Result<NewDonation, AppError> {
        let amount = self
            .amount
            .as_ref()
            .and_then(coerce_f64)
            .ok_or_else(|| AppError::Validation("Invalid amount format".to_string()))?;

        if amount <= 0.0 {
            return Err(AppError::Validation(
                "Amount must be greater than 0".to_string(),
            ));
        }

        let device_id = self
            .device_id
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(NewDonation { amount, device_id })
    }
}
