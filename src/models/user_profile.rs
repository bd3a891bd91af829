//! Per-device user profile model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{coerce_f64, coerce_i64, numeric_field, required};
use crate::errors::AppError;

/// Profile classification, serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum UserTier {
    /// Reserved for admin test devices
    AdminOnly,
    Unknown,
    New,
    Supporter,
    Sponsor,
    Loyal,
}

impl From<UserTier> for i64 {
    fn from(tier: UserTier) -> Self {
        match tier {
            UserTier::AdminOnly => -1,
            UserTier::Unknown => 0,
            UserTier::New => 1,
            UserTier::Supporter => 2,
            UserTier::Sponsor => 3,
            UserTier::Loyal => 4,
        }
    }
}

impl TryFrom<i64> for UserTier {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(UserTier::AdminOnly),
            0 => Ok(UserTier::Unknown),
            1 => Ok(UserTier::New),
            2 => Ok(UserTier::Supporter),
            3 => Ok(UserTier::Sponsor),
            4 => Ok(UserTier::Loyal),
            other => Err(format!("Unknown user type {}", other)),
        }
    }
}

impl UserTier {
    /// Map a stored code, treating unrecognized values as `Unknown`.
    pub fn from_stored(code: i64) -> Self {
        Self::try_from(code).unwrap_or(UserTier::Unknown)
    }

    fn from_field(value: Option<&Value>, default: UserTier) -> Result<Self, AppError> {
        let code = numeric_field(value, "user_type", i64::from(default), coerce_i64)?;
        Self::try_from(code).map_err(AppError::Validation)
    }
}

/// Usage profile of one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub device_id: String,
    pub usage_count: i64,
    /// Hours
    pub usage_duration: f64,
    /// Kilometres
    pub total_distance: f64,
    pub modify_time: String,
    pub sponsor_amount: f64,
    pub user_type: UserTier,
    pub car_model: String,
    pub wechat_name: String,
}

/// Telemetry report posted by the client on start-up.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub usage_count: Option<Value>,
    #[serde(default)]
    pub usage_duration: Option<Value>,
    #[serde(default)]
    pub total_distance: Option<Value>,
    #[serde(default)]
    pub wechat_name: Option<String>,
}

/// Validated telemetry report.
#[derive(Debug, Clone)]
pub struct Telemetry {
    pub device_id: String,
    pub usage_count: i64,
    pub usage_duration: f64,
    pub total_distance: f64,
    /// Only applied to existing profiles when non-empty
    pub wechat_name: Option<String>,
}

fn required_number<N>(
    value: Option<&Value>,
    field: &str,
    coerce: fn(&Value) -> Option<N>,
) -> Result<N, AppError> {
    let value = value.ok_or_else(|| AppError::missing_field(field))?;
    coerce(value).ok_or_else(|| AppError::Validation(format!("Field {} must be a number", field)))
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Telemetry, AppError> {
        let device_id = required(self.device_id, "device_id")?;
        let usage_count = required_number(self.usage_count.as_ref(), "usage_count", coerce_i64)?;
        let usage_duration =
            required_number(self.usage_duration.as_ref(), "usage_duration", coerce_f64)?;
        let total_distance =
            required_number(self.total_distance.as_ref(), "total_distance", coerce_f64)?;

        Ok(Telemetry {
            device_id,
            usage_count,
            usage_duration,
            total_distance,
            wechat_name: self.wechat_name.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// Result of a telemetry registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub user_type: UserTier,
    /// 100 for a first registration, 200 for a returning device
    pub time: i64,
}

impl RegistrationOutcome {
    /// Trial time granted on a first registration.
    pub const FIRST_TIME: i64 = 100;
    /// Trial time granted to a returning device.
    pub const RETURNING_TIME: i64 = 200;

    pub fn is_first_registration(&self) -> bool {
        self.time == Self::FIRST_TIME
    }
}

/// Partial profile update posted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub usage_count: Option<Value>,
    #[serde(default)]
    pub usage_duration: Option<Value>,
    #[serde(default)]
    pub total_distance: Option<Value>,
    #[serde(default)]
    pub sponsor_amount: Option<Value>,
    #[serde(default)]
    pub user_type: Option<Value>,
    #[serde(default)]
    pub car_model: Option<String>,
    #[serde(default)]
    pub wechat_name: Option<String>,
}

/// Fields to overwrite on an existing profile; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub usage_count: Option<i64>,
    pub usage_duration: Option<f64>,
    pub total_distance: Option<f64>,
    pub sponsor_amount: Option<f64>,
    pub user_type: Option<UserTier>,
    pub car_model: Option<String>,
    pub wechat_name: Option<String>,
}

fn optional_number<N>(
    value: Option<&Value>,
    field: &str,
    coerce: fn(&Value) -> Option<N>,
) -> Result<Option<N>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce(v)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Field {} must be a number", field))),
    }
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<(String, ProfileChanges), AppError> {
        let device_id = required(self.device_id, "device_id")?;
        let user_type = match self.user_type.as_ref() {
            None | Some(Value::Null) => None,
            Some(v) => Some(UserTier::from_field(Some(v), UserTier::Unknown)?),
        };

        let changes = ProfileChanges {
            usage_count: optional_number(self.usage_count.as_ref(), "usage_count", coerce_i64)?,
            usage_duration: optional_number(
                self.usage_duration.as_ref(),
                "usage_duration",
                coerce_f64,
            )?,
            total_distance: optional_number(
                self.total_distance.as_ref(),
                "total_distance",
                coerce_f64,
            )?,
            sponsor_amount: optional_number(
                self.sponsor_amount.as_ref(),
                "sponsor_amount",
                coerce_f64,
            )?,
            user_type,
            car_model: self.car_model,
            wechat_name: self.wechat_name,
        };

        Ok((device_id, changes))
    }
}

/// Admin add/edit form for a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub usage_count: Option<Value>,
    #[serde(default)]
    pub usage_duration: Option<Value>,
    #[serde(default)]
    pub total_distance: Option<Value>,
    #[serde(default)]
    pub sponsor_amount: Option<Value>,
    #[serde(default)]
    pub user_type: Option<Value>,
    #[serde(default)]
    pub car_model: Option<String>,
    #[serde(default)]
    pub wechat_name: Option<String>,
}

/// Every mutable column of a profile, as written by the admin form.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub device_id: String,
    pub usage_count: i64,
    pub usage_duration: f64,
    pub total_distance: f64,
    pub sponsor_amount: f64,
    pub user_type: UserTier,
    pub car_model: String,
    pub wechat_name: String,
}

impl ProfileForm {
    /// Missing numeric fields default to zero; malformed ones are rejected.
    pub fn validate(self) -> Result<ProfileRecord, AppError> {
        Ok(ProfileRecord {
            device_id: required(self.device_id, "device_id")?,
            usage_count: numeric_field(self.usage_count.as_ref(), "usage_count", 0, coerce_i64)?,
            usage_duration: numeric_field(
                self.usage_duration.as_ref(),
                "usage_duration",
                0.0,
                coerce_f64,
            )?,
            total_distance: numeric_field(
                self.total_distance.as_ref(),
                "total_distance",
                0.0,
                coerce_f64,
            )?,
            sponsor_amount: numeric_field(
                self.sponsor_amount.as_ref(),
                "sponsor_amount",
                0.0,
                coerce_f64,
            )?,
            user_type: UserTier::from_field(self.user_type.as_ref(), UserTier::Unknown)?,
            car_model: self.car_model.unwrap_or_default(),
            wechat_name: self.wechat_name.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tier_serializes_as_integer() {
        assert_eq!(serde_json::to_value(UserTier::New).unwrap(), json!(1));
        assert_eq!(serde_json::to_value(UserTier::AdminOnly).unwrap(), json!(-1));
        let tier: UserTier = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(tier, UserTier::Loyal);
        assert!(serde_json::from_value::<UserTier>(json!(9)).is_err());
    }

    #[test]
    fn test_unknown_stored_tier() {
        assert_eq!(UserTier::from_stored(42), UserTier::Unknown);
        assert_eq!(UserTier::from_stored(3), UserTier::Sponsor);
    }

    #[test]
    fn test_register_requires_all_counters() {
        let err = RegisterRequest {
            device_id: Some("DEV".into()),
            usage_count: Some(json!(3)),
            usage_duration: None,
            total_distance: Some(json!(1.5)),
            wechat_name: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.message(), "Missing required field: usage_duration");
    }

    #[test]
    fn test_profile_form_defaults() {
        let record = ProfileForm {
            device_id: Some("DEV".into()),
            usage_count: Some(json!("")),
            usage_duration: None,
            total_distance: Some(json!("12.5")),
            sponsor_amount: None,
            user_type: Some(json!("2")),
            car_model: None,
            wechat_name: None,
        }
        .validate()
        .unwrap();
        assert_eq!(record.usage_count, 0);
        assert_eq!(record.total_distance, 12.5);
        assert_eq!(record.user_type, UserTier::Supporter);
        assert_eq!(record.car_model, "");
    }

    #[test]
    fn test_profile_form_rejects_bad_tier() {
        let result = ProfileForm {
            device_id: Some("DEV".into()),
            usage_count: None,
            usage_duration: None,
            total_distance: None,
            sponsor_amount: None,
            user_type: Some(json!(7)),
            car_model: None,
            wechat_name: None,
        }
        .validate();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
