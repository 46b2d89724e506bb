//! Statistics and streak engine plus profile operations.
//!
//! Counters are changed with the store's atomic increment and maximum
//! transforms, never by reading the profile and writing it back.

use std::sync::Arc;

use chrono::Utc;

use super::model::{display_name, PreferencesPatch, User, UserPreferences, UserStatistics};
use super::CompletionRecorder;
use crate::error::{CoreError, Result, ValidationError};
use crate::feed::Feed;
use crate::storage::document::decode;
use crate::storage::{collections, DocumentStore, DocumentStoreExt, FieldUpdate, ProfileConfig};

pub type ProfileFeed = Feed<Option<User>>;

pub struct StatisticsEngine {
    store: Arc<dyn DocumentStore>,
    config: ProfileConfig,
}

impl StatisticsEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: ProfileConfig) -> Self {
        Self { store, config }
    }

    /// Count one completed order worth `duration_minutes`.
    pub fn record_completion(&self, user_id: &str, duration_minutes: u32) -> Result<UserStatistics> {
        let user = self.update(
            user_id,
            &[
                FieldUpdate::increment("statistics.totalActivitiesCompleted", 1),
                FieldUpdate::increment("statistics.totalMinutes", i64::from(duration_minutes)),
            ],
        )?;
        tracing::info!(
            user_id,
            duration_minutes,
            total = user.statistics.total_activities_completed,
            "completion recorded"
        );
        Ok(user.statistics)
    }

    /// Store an externally computed streak; `longestStreak` only ever grows.
    pub fn update_streak(&self, user_id: &str, current_streak: u32) -> Result<UserStatistics> {
        let user = self.update(
            user_id,
            &[
                FieldUpdate::set("statistics.currentStreak", current_streak),
                FieldUpdate::maximum("statistics.longestStreak", i64::from(current_streak)),
            ],
        )?;
        tracing::debug!(user_id, current_streak, longest = user.statistics.longest_streak, "streak updated");
        Ok(user.statistics)
    }

    pub fn statistics(&self, user_id: &str) -> Result<UserStatistics> {
        Ok(self.fetch_profile(user_id)?.statistics)
    }

    /// Create (or overwrite) a profile with zeroed statistics.
    pub fn create_profile(&self, user_id: &str, email: &str, name: Option<&str>) -> Result<User> {
        if user_id.trim().is_empty() {
            return Err(ValidationError::empty("userId").into());
        }
        if email.trim().is_empty() {
            return Err(ValidationError::empty("email").into());
        }

        let now = Utc::now();
        let user = User {
            id: user_id.to_string(),
            email: email.trim().to_string(),
            name: display_name(email.trim(), name),
            created_at: now,
            last_login_at: now,
            statistics: UserStatistics::default(),
            preferences: UserPreferences {
                daily_goal: self.config.daily_goal,
                ..UserPreferences::default()
            },
        };
        self.store.put(collections::USERS, user_id, &user)?;
        tracing::info!(user_id, name = %user.name, "user profile created");
        Ok(user)
    }

    pub fn fetch_profile(&self, user_id: &str) -> Result<User> {
        self.store
            .get_as::<User>(collections::USERS, user_id)?
            .ok_or_else(|| CoreError::not_found("user profile", user_id))
    }

    /// Fetch the profile, creating it when it does not exist yet. An
    /// existing profile keeps its statistics.
    pub fn ensure_profile(&self, user_id: &str, email: &str, name: Option<&str>) -> Result<User> {
        match self.fetch_profile(user_id) {
            Ok(user) => Ok(user),
            Err(err) if err.is_not_found() => self.create_profile(user_id, email, name),
            Err(err) => Err(err),
        }
    }

    pub fn update_name(&self, user_id: &str, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::empty("name").into());
        }
        self.update(user_id, &[FieldUpdate::set("name", name)])
    }

    pub fn touch_last_login(&self, user_id: &str) -> Result<User> {
        self.update(user_id, &[FieldUpdate::set_timestamp("lastLoginAt", Utc::now())])
    }

    pub fn update_preferences(&self, user_id: &str, patch: PreferencesPatch) -> Result<User> {
        if patch.daily_goal == Some(0) {
            return Err(ValidationError::invalid("dailyGoal", "must be positive").into());
        }
        if patch.is_empty() {
            return self.fetch_profile(user_id);
        }

        let mut updates = Vec::new();
        if let Some(enabled) = patch.notifications_enabled {
            updates.push(FieldUpdate::set("preferences.notificationsEnabled", enabled));
        }
        if let Some(dark_mode) = patch.dark_mode {
            updates.push(FieldUpdate::set("preferences.darkMode", dark_mode));
        }
        if let Some(goal) = patch.daily_goal {
            updates.push(FieldUpdate::set("preferences.dailyGoal", goal));
        }
        self.update(user_id, &updates)
    }

    pub fn delete_profile(&self, user_id: &str) -> Result<()> {
        if !self.store.delete(collections::USERS, user_id)? {
            return Err(CoreError::not_found("user profile", user_id));
        }
        tracing::info!(user_id, "user profile deleted");
        Ok(())
    }

    /// Feed of the profile document; `None` while it does not exist or
    /// cannot be read.
    pub fn subscribe(&self, user_id: &str) -> ProfileFeed {
        let store = Arc::clone(&self.store);
        let watched = user_id.to_string();
        let owner = user_id.to_string();

        Feed::new(
            self.store.watch(),
            move |event| event.is_for(collections::USERS) && event.id == watched,
            move || match store.get_as::<User>(collections::USERS, &owner) {
                Ok(user) => user,
                Err(err) => {
                    tracing::warn!(user_id = %owner, error = %err, "profile feed read failed");
                    None
                }
            },
        )
    }

    fn update(&self, user_id: &str, updates: &[FieldUpdate]) -> Result<User> {
        let doc = self
            .store
            .update(collections::USERS, user_id, updates)
            .map_err(|err| {
                if err.is_not_found() {
                    CoreError::not_found("user profile", user_id)
                } else {
                    err
                }
            })?;
        decode(collections::USERS, user_id, doc)
    }
}

impl CompletionRecorder for StatisticsEngine {
    fn record_completion(&self, user_id: &str, duration_minutes: u32) -> Result<()> {
        StatisticsEngine::record_completion(self, user_id, duration_minutes).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn engine() -> StatisticsEngine {
        StatisticsEngine::new(Arc::new(MemoryStore::new()), ProfileConfig::default())
    }

    #[test]
    fn record_completion_increments_totals() {
        let stats = engine();
        stats.create_profile("u", "u@example.com", None).unwrap();
        stats.record_completion("u", 5).unwrap();
        let totals = stats.record_completion("u", 20).unwrap();
        assert_eq!(totals.total_activities_completed, 2);
        assert_eq!(totals.total_minutes, 25);
    }

    #[test]
    fn missing_profile_is_not_found() {
        let stats = engine();
        assert!(stats.record_completion("ghost", 5).unwrap_err().is_not_found());
        assert!(stats.statistics("ghost").unwrap_err().is_not_found());
        assert!(stats.delete_profile("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn streak_keeps_longest() {
        let stats = engine();
        stats.create_profile("u", "u@example.com", None).unwrap();
        stats.update_streak("u", 4).unwrap();
        let after_reset = stats.update_streak("u", 1).unwrap();
        assert_eq!(after_reset.current_streak, 1);
        assert_eq!(after_reset.longest_streak, 4);
    }

    #[test]
    fn profile_uses_configured_daily_goal() {
        let stats = StatisticsEngine::new(
            Arc::new(MemoryStore::new()),
            ProfileConfig { daily_goal: 45 },
        );
        let user = stats.create_profile("u", "sam@example.com", None).unwrap();
        assert_eq!(user.name, "sam");
        assert_eq!(user.preferences.daily_goal, 45);
        assert!(user.preferences.notifications_enabled);
    }

    #[test]
    fn ensure_profile_creates_once() {
        let stats = engine();
        let first = stats.ensure_profile("u", "a@example.com", None).unwrap();
        stats.update_name("u", "Alex").unwrap();
        let second = stats.ensure_profile("u", "a@example.com", None).unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name, "Alex");
    }

    #[test]
    fn preferences_patch_touches_only_given_fields() {
        let stats = engine();
        stats.create_profile("u", "a@example.com", None).unwrap();
        let user = stats
            .update_preferences(
                "u",
                PreferencesPatch {
                    dark_mode: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(user.preferences.dark_mode);
        assert!(user.preferences.notifications_enabled);
        assert_eq!(user.preferences.daily_goal, 120);
    }

    #[test]
    fn zero_daily_goal_is_rejected() {
        let stats = engine();
        stats.create_profile("u", "a@example.com", None).unwrap();
        let patch = PreferencesPatch {
            daily_goal: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            stats.update_preferences("u", patch).unwrap_err(),
            CoreError::Validation(_)
        ));
    }
}
