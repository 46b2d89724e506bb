//! Menu metadata for the five categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity::ActivityCategory;
use crate::error::Result;
use crate::storage::{collections, DocumentStore, DocumentStoreExt};

pub const MENU_DOCUMENT: &str = "categories";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuCategoryInfo {
    pub title: String,
    pub description: String,
    pub icon: String,
    /// Sort position in the menu.
    pub order: u32,
}

impl MenuCategoryInfo {
    fn new(title: &str, description: &str, icon: &str, order: u32) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuConfiguration {
    pub starters: MenuCategoryInfo,
    pub mains: MenuCategoryInfo,
    pub sides: MenuCategoryInfo,
    pub desserts: MenuCategoryInfo,
    pub specials: MenuCategoryInfo,
    pub updated_at: DateTime<Utc>,
}

impl Default for MenuConfiguration {
    fn default() -> Self {
        Self {
            starters: MenuCategoryInfo::new(
                "Starters",
                "Quick 5–10 minute activities for a fast mood lift (like a short walk, stretching, or listening to a favorite song).",
                "⚡",
                1,
            ),
            mains: MenuCategoryInfo::new(
                "Mains",
                "Longer, more fulfilling activities that provide a deeper sense of reward and satisfaction (like exercising, organizing a space, or cooking a meal).",
                "🎯",
                2,
            ),
            sides: MenuCategoryInfo::new(
                "Sides",
                "Complementary actions that make tasks easier or more enjoyable (setting reminders, playing music while cleaning, etc.).",
                "🔧",
                3,
            ),
            desserts: MenuCategoryInfo::new(
                "Desserts",
                "Pleasurable activities to enjoy in moderation (watching a show, social media time, snacks).",
                "🍰",
                4,
            ),
            specials: MenuCategoryInfo::new(
                "Specials",
                "Planned or goal-oriented activities for extra motivation (journal sessions, hobby time, creative projects).",
                "⭐",
                5,
            ),
            updated_at: Utc::now(),
        }
    }
}

impl MenuConfiguration {
    /// Read `menu/categories`, falling back to the built-in default when the
    /// document is missing, unreadable or malformed.
    pub fn load(store: &dyn DocumentStore) -> Self {
        match store.get_as::<MenuConfiguration>(collections::MENU, MENU_DOCUMENT) {
            Ok(Some(menu)) => menu,
            Ok(None) => {
                tracing::debug!("menu document missing, using default");
                Self::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "menu unavailable, using default");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn DocumentStore) -> Result<()> {
        store.put(collections::MENU, MENU_DOCUMENT, self)
    }

    pub fn info(&self, category: ActivityCategory) -> &MenuCategoryInfo {
        match category {
            ActivityCategory::Starters => &self.starters,
            ActivityCategory::Mains => &self.mains,
            ActivityCategory::Sides => &self.sides,
            ActivityCategory::Desserts => &self.desserts,
            ActivityCategory::Special => &self.specials,
        }
    }

    /// Categories sorted by their `order`.
    pub fn ordered(&self) -> Vec<(ActivityCategory, &MenuCategoryInfo)> {
        let mut all: Vec<_> = ActivityCategory::ALL
            .iter()
            .map(|&category| (category, self.info(category)))
            .collect();
        all.sort_by_key(|(_, info)| info.order);
        all
    }
}
