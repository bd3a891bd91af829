//! REST API module.
//!
//! Contains the handlers of both services plus the shared response envelope,
//! body extractor and field coercion helpers.

mod apk;
mod donations;
mod feedback;
mod logs;
mod users;
mod videos;

pub use apk::*;
pub use donations::*;
pub use feedback::*;
pub use logs::*;
pub use users::*;
pub use videos::*;

use axum::{
    extract::{FromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// Success response envelope.
///
/// `success` sits next to `status` because the Android client reads the boolean.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize = ()> {
    pub status: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl ApiResponse<()> {
    /// A success envelope carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            success: true,
            message: Some(message.into()),
            count: None,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Success envelope with the payload's fields inlined at the top level.
///
/// Used where clients read fields such as `version_code` or `user_type`
/// directly from the response object.
#[derive(Debug, Serialize)]
pub struct FlatResponse<T: Serialize> {
    pub status: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub fields: T,
}

impl<T: Serialize> FlatResponse<T> {
    pub fn new(fields: T) -> Self {
        Self {
            status: "success",
            success: true,
            message: None,
            fields,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for FlatResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T = ()> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Create a successful list response with its `count`.
pub fn success_list<T: Serialize>(items: Vec<T>) -> ApiResult<Vec<T>> {
    let count = items.len();
    Ok(ApiResponse::new(items).with_count(count))
}

/// Body extractor accepting either a JSON or a URL-encoded form body.
///
/// Decoding failures become `400` envelopes instead of axum's plain-text rejections.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.trim_start().starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

/// Take a required text field, rejecting absent or blank values.
pub fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::missing_field(field)),
    }
}

/// Coerce a JSON number or numeric string to `f64`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Coerce a JSON number or numeric string to `i64`.
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Optional numeric field: absent or blank yields `default`, garbage is a validation error.
pub fn numeric_field<N>(
    value: Option<&Value>,
    field: &str,
    default: N,
    coerce: fn(&Value) -> Option<N>,
) -> Result<N, AppError> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(default),
        Some(v) => coerce(v)
            .ok_or_else(|| AppError::Validation(format!("Field {} must be a number", field))),
    }
}
