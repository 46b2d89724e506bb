//! User-authored activities.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::activity::ActivityCategory;
use crate::error::{CoreError, Result, ValidationError};
use crate::storage::{collections, DocumentStore, DocumentStoreExt, FieldUpdate, Filter, OrderBy, Query};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: ActivityCategory,
    pub duration_minutes: u32,
    pub scheduled_time: NaiveTime,
    pub scheduled_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_on_home_screen: bool,
}

/// Input for [`UserActivityStore::create`].
#[derive(Debug, Clone)]
pub struct NewUserActivity {
    pub title: String,
    pub category: ActivityCategory,
    pub duration_minutes: i64,
    pub scheduled_time: NaiveTime,
    pub scheduled_date: NaiveDate,
    pub is_on_home_screen: bool,
}

impl NewUserActivity {
    fn validate(&self) -> std::result::Result<u32, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::empty("title"));
        }
        if self.duration_minutes <= 0 {
            return Err(ValidationError::invalid(
                "durationMinutes",
                format!("must be positive, got {}", self.duration_minutes),
            ));
        }
        u32::try_from(self.duration_minutes)
            .map_err(|_| ValidationError::invalid("durationMinutes", "too large"))
    }
}

pub struct UserActivityStore {
    store: Arc<dyn DocumentStore>,
}

impl UserActivityStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validates before anything is written.
    pub fn create(&self, user_id: &str, input: NewUserActivity) -> Result<UserActivity> {
        let duration_minutes = input.validate()?;
        let activity = UserActivity {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: input.title.trim().to_string(),
            category: input.category,
            duration_minutes,
            scheduled_time: input.scheduled_time,
            scheduled_date: input.scheduled_date,
            created_at: Utc::now(),
            is_on_home_screen: input.is_on_home_screen,
        };
        self.store
            .put(collections::USER_ACTIVITIES, &activity.id, &activity)?;
        tracing::info!(user_id, id = %activity.id, title = %activity.title, "user activity created");
        Ok(activity)
    }

    pub fn get(&self, id: &str) -> Result<Option<UserActivity>> {
        self.store.get_as(collections::USER_ACTIVITIES, id)
    }

    /// Newest first.
    pub fn list(&self, user_id: &str) -> Result<Vec<UserActivity>> {
        list_for(self.store.as_ref(), user_id)
    }

    pub fn home_screen(&self, user_id: &str) -> Result<Vec<UserActivity>> {
        self.store.query_as(
            collections::USER_ACTIVITIES,
            &Query::new()
                .filter(Filter::eq("userId", user_id))
                .filter(Filter::eq("isOnHomeScreen", true))
                .order_by(OrderBy::asc("scheduledTime")),
        )
    }

    /// Only the owner may delete; anyone else sees `NotFound`.
    pub fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        self.owned(user_id, id)?;
        self.store.delete(collections::USER_ACTIVITIES, id)?;
        tracing::info!(user_id, id, "user activity deleted");
        Ok(())
    }

    pub fn set_on_home_screen(&self, user_id: &str, id: &str, on_home_screen: bool) -> Result<UserActivity> {
        self.owned(user_id, id)?;
        let doc = self.store.update(
            collections::USER_ACTIVITIES,
            id,
            &[FieldUpdate::set("isOnHomeScreen", on_home_screen)],
        )?;
        crate::storage::document::decode(collections::USER_ACTIVITIES, id, doc)
    }

    fn owned(&self, user_id: &str, id: &str) -> Result<UserActivity> {
        match self.get(id)? {
            Some(activity) if activity.user_id == user_id => Ok(activity),
            _ => Err(CoreError::not_found("user activity", id)),
        }
    }
}

pub(super) fn list_for(store: &dyn DocumentStore, user_id: &str) -> Result<Vec<UserActivity>> {
    store.query_as(
        collections::USER_ACTIVITIES,
        &Query::new()
            .filter(Filter::eq("userId", user_id))
            .order_by(OrderBy::desc("createdAt")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn input(title: &str, duration_minutes: i64) -> NewUserActivity {
        NewUserActivity {
            title: title.to_string(),
            category: ActivityCategory::Mains,
            duration_minutes,
            scheduled_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            scheduled_date: NaiveDate::from_ymd_opt(2025, 10, 21).unwrap(),
            is_on_home_screen: false,
        }
    }

    #[test]
    fn create_rejects_empty_title_without_writing() {
        let store = Arc::new(MemoryStore::new());
        let activities = UserActivityStore::new(store.clone());
        let err = activities.create("u", input("   ", 10)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyField { .. })));
        assert_eq!(store.len(collections::USER_ACTIVITIES), 0);
    }

    #[test]
    fn create_rejects_non_positive_duration() {
        let activities = UserActivityStore::new(Arc::new(MemoryStore::new()));
        assert!(activities.create("u", input("Run", 0)).is_err());
        assert!(activities.create("u", input("Run", -5)).is_err());
    }

    #[test]
    fn missing_home_screen_flag_defaults_to_false() {
        let doc = serde_json::json!({
            "id": "a",
            "userId": "u",
            "title": "Guitar",
            "category": "special",
            "durationMinutes": 30,
            "scheduledTime": "18:00:00",
            "scheduledDate": "2025-10-21",
            "createdAt": "2025-10-21T08:00:00Z"
        });
        let activity: UserActivity = serde_json::from_value(doc).unwrap();
        assert!(!activity.is_on_home_screen);
    }

    #[test]
    fn delete_by_other_user_is_not_found() {
        let activities = UserActivityStore::new(Arc::new(MemoryStore::new()));
        let created = activities.create("owner", input("Run", 20)).unwrap();

        let err = activities.delete("intruder", &created.id).unwrap_err();
        assert!(err.is_not_found());
        activities.delete("owner", &created.id).unwrap();
        assert!(activities.get(&created.id).unwrap().is_none());
    }

    #[test]
    fn home_screen_lists_only_pinned() {
        let activities = UserActivityStore::new(Arc::new(MemoryStore::new()));
        let pinned = activities.create("u", input("Run", 20)).unwrap();
        activities.create("u", input("Read", 15)).unwrap();

        let updated = activities.set_on_home_screen("u", &pinned.id, true).unwrap();
        assert!(updated.is_on_home_screen);

        let home = activities.home_screen("u").unwrap();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].id, pinned.id);
        assert_eq!(activities.list("u").unwrap().len(), 2);
    }
}
