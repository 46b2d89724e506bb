//! User statistics, streaks and profiles.

mod engine;
mod model;

pub use engine::{ProfileFeed, StatisticsEngine};
pub use model::{display_name, PreferencesPatch, User, UserPreferences, UserStatistics};

use crate::error::Result;

/// Receives the side effect of an order reaching `completed` for the first
/// time.
pub trait CompletionRecorder: Send + Sync {
    fn record_completion(&self, user_id: &str, duration_minutes: u32) -> Result<()>;
}
