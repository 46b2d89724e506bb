//! Activity catalog: system activities, user activities and menu metadata.
//!
//! The catalog is read once per session and is the resolver the cart and
//! checkout use to turn an activity reference into a name and a duration.

mod activity;
mod menu;
mod user_activity;

pub use activity::{sample_activities, Activity, ActivityCategory, ActivityType, Difficulty};
pub use menu::{MenuCategoryInfo, MenuConfiguration, MENU_DOCUMENT};
pub use user_activity::{NewUserActivity, UserActivity, UserActivityStore};

use serde::Serialize;

use crate::error::Result;
use crate::storage::document::decode;
use crate::storage::{collections, DocumentStore, DocumentStoreExt, Filter, Query};

/// Denormalized view of an activity reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedActivity {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub duration_minutes: u32,
}

/// Resolves cart and order references against catalog data.
///
/// `None` means the reference dangles; callers treat it as contributing
/// nothing rather than failing.
pub trait ActivityResolver: Send + Sync {
    fn resolve(&self, activity_id: &str, is_user_activity: bool) -> Option<ResolvedActivity>;
}

/// Optional criteria for [`Catalog::filter`]; `None` means "any".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub category: Option<ActivityCategory>,
    pub difficulty: Option<Difficulty>,
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    activities: Vec<Activity>,
    user_activities: Vec<UserActivity>,
    fallback: bool,
}

impl Catalog {
    pub fn from_parts(activities: Vec<Activity>, user_activities: Vec<UserActivity>) -> Self {
        Self {
            activities,
            user_activities,
            fallback: false,
        }
    }

    /// The built-in sample catalog with no user activities.
    pub fn samples() -> Self {
        Self {
            activities: sample_activities(),
            user_activities: Vec::new(),
            fallback: true,
        }
    }

    /// Load active system activities and, when `user_id` is given, that
    /// user's activities. Never fails: an unreadable activity collection
    /// yields the sample catalog and unreadable user activities yield none.
    pub fn load(store: &dyn DocumentStore, user_id: Option<&str>) -> Self {
        let (activities, fallback) = match Self::read_activities(store) {
            Ok(activities) => (activities, false),
            Err(err) => {
                tracing::warn!(error = %err, "activity catalog unavailable, using sample data");
                (sample_activities(), true)
            }
        };

        let user_activities = match user_id {
            Some(user_id) => user_activity::list_for(store, user_id).unwrap_or_else(|err| {
                tracing::warn!(user_id, error = %err, "user activities unavailable");
                Vec::new()
            }),
            None => Vec::new(),
        };

        tracing::debug!(
            activities = activities.len(),
            user_activities = user_activities.len(),
            fallback,
            "catalog loaded"
        );
        Self {
            activities,
            user_activities,
            fallback,
        }
    }

    fn read_activities(store: &dyn DocumentStore) -> Result<Vec<Activity>> {
        let docs = store.query(
            collections::ACTIVITIES,
            &Query::new().filter(Filter::eq("isActive", true)),
        )?;

        let mut activities: Vec<Activity> = docs
            .into_iter()
            .filter_map(|doc| match decode(collections::ACTIVITIES, &doc.id, doc.data) {
                Ok(activity) => Some(activity),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping malformed activity");
                    None
                }
            })
            .collect();
        activities.sort_by(|a: &Activity, b: &Activity| {
            (a.category, a.id.parse::<u64>().ok(), &a.id).cmp(&(b.category, b.id.parse::<u64>().ok(), &b.id))
        });
        Ok(activities)
    }

    /// True when the store could not be read and samples were substituted.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn user_activities(&self) -> &[UserActivity] {
        &self.user_activities
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn user_activity(&self, id: &str) -> Option<&UserActivity> {
        self.user_activities.iter().find(|a| a.id == id)
    }

    pub fn by_category(&self, category: ActivityCategory) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| a.category == category)
            .collect()
    }

    /// Empty query returns everything.
    pub fn search(&self, query: &str) -> Vec<&Activity> {
        let query = query.trim();
        self.activities
            .iter()
            .filter(|a| query.is_empty() || a.matches(query))
            .collect()
    }

    pub fn filter(&self, criteria: ActivityFilter) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| criteria.category.map_or(true, |c| a.category == c))
            .filter(|a| criteria.difficulty.map_or(true, |d| a.difficulty == d))
            .filter(|a| criteria.min_duration.map_or(true, |m| a.duration_minutes >= m))
            .filter(|a| criteria.max_duration.map_or(true, |m| a.duration_minutes <= m))
            .collect()
    }
}

impl ActivityResolver for Catalog {
    fn resolve(&self, activity_id: &str, is_user_activity: bool) -> Option<ResolvedActivity> {
        if is_user_activity {
            self.user_activity(activity_id).map(|a| ResolvedActivity {
                id: a.id.clone(),
                name: a.title.clone(),
                icon: String::new(),
                duration_minutes: a.duration_minutes,
            })
        } else {
            self.activity(activity_id).map(|a| ResolvedActivity {
                id: a.id.clone(),
                name: a.name.clone(),
                icon: a.icon.clone(),
                duration_minutes: a.duration_minutes,
            })
        }
    }
}

/// Write the sample catalog (all active) and return how many were written.
pub fn seed_sample_activities(store: &dyn DocumentStore) -> Result<usize> {
    let samples = sample_activities();
    for activity in &samples {
        store.put(collections::ACTIVITIES, &activity.id, activity)?;
    }
    tracing::info!(count = samples.len(), "sample activities seeded");
    Ok(samples.len())
}
