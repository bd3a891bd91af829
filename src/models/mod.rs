//! Data models for the feedback and usage services.
//!
//! Field names are snake_case on the wire to match the Android client.

mod apk_version;
mod dashboard;
mod donation;
mod feedback;
mod operation_log;
mod user_profile;
mod video;

pub use apk_version::*;
pub use dashboard::*;
pub use donation::*;
pub use feedback::*;
pub use operation_log::*;
pub use user_profile::*;
pub use video::*;
