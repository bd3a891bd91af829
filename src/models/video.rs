//! Video catalog model.

use serde::{Deserialize, Serialize};

use crate::api::required;
use crate::errors::AppError;

/// A tutorial video shown in the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    pub video_title: String,
    pub video_link: String,
}

/// Admin add/edit form for a video.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoForm {
    #[serde(default)]
    pub video_title: Option<String>,
    #[serde(default)]
    pub video_link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub video_title: String,
    pub video_link: String,
}

impl VideoForm {
    pub fn validate(self) -> Result<NewVideo, AppError> {
        Ok(NewVideo {
            video_title: required(self.video_title, "video_title")?,
            video_link: required(self.video_link, "video_link")?,
        })
    }
}
