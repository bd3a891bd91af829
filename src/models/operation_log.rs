//! Free-text operation log model.

use serde::{Deserialize, Serialize};

use crate::api::required;
use crate::errors::AppError;

/// An admin-entered log line about a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    pub id: i64,
    pub device_id: String,
    pub log_time: String,
    pub operation_record: String,
}

/// Admin add/edit form for a log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LogForm {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub operation_record: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOperationLog {
    pub device_id: String,
    pub operation_record: String,
}

impl LogForm {
    pub fn validate(self) -> Result<NewOperationLog, AppError> {
        Ok(NewOperationLog {
            device_id: required(self.device_id, "device_id")?,
            operation_record: required(self.operation_record, "operation_record")?,
        })
    }
}
