//! APK version model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{coerce_i64, required};
use crate::errors::AppError;

/// A released APK build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApkVersion {
    pub id: i64,
    /// Unique build number, e.g. `250909`
    pub version_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    pub update_notes: String,
    pub download_url: String,
    /// Size in bytes, 0 when unknown
    pub file_size: i64,
    pub upload_time: String,
    pub is_active: bool,
}

/// Public view of the active version advertised to clients.
#[derive(Debug, Clone, Serialize)]
pub struct LatestApkVersion {
    pub version_code: String,
    pub version_name: String,
    pub update_notes: String,
    pub download_url: String,
    pub file_size: i64,
    pub upload_time: String,
}

impl From<ApkVersion> for LatestApkVersion {
    fn from(version: ApkVersion) -> Self {
        let version_name = version
            .version_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("v{}", version.version_code));
        Self {
            version_code: version.version_code,
            version_name,
            update_notes: version.update_notes,
            download_url: version.download_url,
            file_size: version.file_size,
            upload_time: version.upload_time,
        }
    }
}

/// Admin form for publishing a new version.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApkVersionRequest {
    #[serde(default)]
    pub version_code: Option<String>,
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub update_notes: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub file_size: Option<Value>,
}

/// Validated version ready for activation.
#[derive(Debug, Clone)]
pub struct NewApkVersion {
    pub version_code: String,
    pub version_name: String,
    pub update_notes: String,
    pub download_url: String,
    pub file_size: i64,
}

impl CreateApkVersionRequest {
    /// Check required fields and the download URL scheme.
    ///
    /// An unparseable `file_size` is recorded as 0 rather than rejected.
    pub fn validate(self) -> Result<NewApkVersion, AppError> {
        let version_code = required(self.version_code, "version_code")?;
        let update_notes = required(self.update_notes, "update_notes")?;
        let download_url = required(self.download_url, "download_url")?;

        if !(download_url.starts_with("http://") || download_url.starts_with("https://")) {
            return Err(AppError::Validation(
                "download_url must start with http:// or https://".to_string(),
            ));
        }

        let file_size = self.file_size.as_ref().and_then(coerce_i64).unwrap_or(0);

        Ok(NewApkVersion {
            version_code,
            version_name: self.version_name.unwrap_or_default().trim().to_string(),
            update_notes,
            download_url,
            file_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(url: &str, size: Value) -> CreateApkVersionRequest {
        CreateApkVersionRequest {
            version_code: Some("250909".into()),
            version_name: None,
            update_notes: Some("Bug fixes".into()),
            download_url: Some(url.into()),
            file_size: Some(size),
        }
    }

    #[test]
    fn test_validate_accepts_http_urls() {
        let new = request("https://cdn.example.com/app.apk", json!("1024"))
            .validate()
            .unwrap();
        assert_eq!(new.file_size, 1024);
        assert_eq!(new.version_name, "");
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let err = request("ftp://example.com/app.apk", json!(0))
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_bad_file_size_falls_back_to_zero() {
        let new = request("http://example.com/a.apk", json!("big"))
            .validate()
            .unwrap();
        assert_eq!(new.file_size, 0);
    }

    #[test]
    fn test_latest_version_name_fallback() {
        let version = ApkVersion {
            id: 1,
            version_code: "250909".into(),
            version_name: Some(String::new()),
            update_notes: "notes".into(),
            download_url: "https://example.com/a.apk".into(),
            file_size: 0,
            upload_time: "2025-09-09T00:00:00Z".into(),
            is_active: true,
        };
        assert_eq!(LatestApkVersion::from(version).version_name, "v250909");
    }
}
