//! Feedback model.

use serde::{Deserialize, Serialize};

/// A feedback submission from the Android client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    /// Submitter id as sent by the client
    pub user_id: String,
    /// Client-side submission time, stored verbatim
    pub time: String,
    pub feedback: String,
    /// Stored image filenames under the upload directory
    pub images: Vec<String>,
    /// Admin note
    pub note: String,
    pub created_at: String,
}

/// Validated feedback ready for insertion.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub user_id: String,
    pub time: String,
    pub feedback: String,
    pub images: Vec<String>,
}

/// Request body for updating the admin note.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub note: Option<String>,
}
