//! Aggregated views over the usage database.

use serde::Serialize;

use super::{OperationLog, UserProfile};

/// Admin dashboard summary.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub users_count: i64,
    pub logs_count: i64,
    pub videos_count: i64,
    pub recent_users: Vec<UserProfile>,
    pub recent_logs: Vec<OperationLog>,
}

/// Public leaderboard: the same profiles in three orderings.
#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub by_duration: Vec<UserProfile>,
    pub by_distance: Vec<UserProfile>,
    pub by_count: Vec<UserProfile>,
}
