//! User profile documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running totals for a user. Only the statistics engine writes these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    #[serde(default)]
    pub current_streak: u32,
    /// Never below `current_streak`.
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub total_activities_completed: u64,
    #[serde(default)]
    pub total_minutes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub notifications_enabled: bool,
    pub dark_mode: bool,
    /// Minutes per day.
    pub daily_goal: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            dark_mode: false,
            daily_goal: 120,
        }
    }
}

/// Partial preference change; `None` leaves the stored value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub notifications_enabled: Option<bool>,
    pub dark_mode: Option<bool>,
    pub daily_goal: Option<u32>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self.notifications_enabled.is_none() && self.dark_mode.is_none() && self.daily_goal.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    #[serde(default)]
    pub statistics: UserStatistics,
    #[serde(default)]
    pub preferences: UserPreferences,
}

/// Name shown for a new profile: the explicit one, else the email's local part.
pub fn display_name(email: &str, name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string(),
    }
}
