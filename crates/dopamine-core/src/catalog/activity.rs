//! System activities: the read-only menu every user picks from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Menu section an activity is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Starters,
    Mains,
    Sides,
    Desserts,
    Special,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 5] = [
        ActivityCategory::Starters,
        ActivityCategory::Mains,
        ActivityCategory::Sides,
        ActivityCategory::Desserts,
        ActivityCategory::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Starters => "starters",
            ActivityCategory::Mains => "mains",
            ActivityCategory::Sides => "sides",
            ActivityCategory::Desserts => "desserts",
            ActivityCategory::Special => "special",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityCategory::Starters => "Starters",
            ActivityCategory::Mains => "Mains",
            ActivityCategory::Sides => "Sides",
            ActivityCategory::Desserts => "Desserts",
            ActivityCategory::Special => "Special",
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starters" => Ok(ActivityCategory::Starters),
            "mains" => Ok(ActivityCategory::Mains),
            "sides" => Ok(ActivityCategory::Sides),
            "desserts" => Ok(ActivityCategory::Desserts),
            "special" | "specials" => Ok(ActivityCategory::Special),
            _ => Err(format!("Unknown category: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Focus,
    Creativity,
    Productivity,
    Wellness,
    Mindfulness,
    Energy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!("Unknown difficulty: {s}")),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ActivityCategory,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    /// Soft-delete flag; inactive activities are hidden from the catalog.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Activity {
    /// Case-insensitive match over name, description and benefits.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .benefits
                .iter()
                .any(|b| b.to_lowercase().contains(&needle))
    }
}

#[allow(clippy::too_many_arguments)]
fn sample(
    id: &str,
    name: &str,
    description: &str,
    category: ActivityCategory,
    duration_minutes: u32,
    difficulty: Difficulty,
    benefits: [&str; 3],
    icon: &str,
    activity_type: ActivityType,
) -> Activity {
    Activity {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        duration_minutes,
        difficulty,
        benefits: benefits.iter().map(|b| b.to_string()).collect(),
        icon: icon.to_string(),
        activity_type: Some(activity_type),
        is_active: true,
    }
}

/// Built-in catalog, used for seeding and whenever the store is unreadable.
pub fn sample_activities() -> Vec<Activity> {
    use ActivityCategory::*;
    use ActivityType::*;
    use Difficulty::*;

    vec![
        sample("1", "5-Min Breathing", "Deep breathing exercise to center your mind and reduce stress",
            Starters, 5, Easy, ["Focus", "Calm", "Energy"], "🧘", Mindfulness),
        sample("2", "Morning Stretch", "Gentle stretching routine to wake up your body",
            Starters, 10, Easy, ["Energy", "Flexibility", "Wellness"], "💪", Wellness),
        sample("3", "Morning Meditation", "Start your day with mindful meditation",
            Starters, 15, Easy, ["Focus", "Peace", "Clarity"], "🧘", Focus),
        sample("4", "Deep Work Session", "90 minutes of focused, uninterrupted work",
            Mains, 90, Hard, ["Productivity", "Achievement", "Growth"], "💻", Productivity),
        sample("5", "Creative Writing", "Express yourself through creative writing",
            Mains, 60, Medium, ["Creativity", "Expression", "Flow"], "✍️", Creativity),
        sample("6", "Learning Session", "Study something new and expand your knowledge",
            Mains, 45, Medium, ["Knowledge", "Growth", "Achievement"], "📚", Focus),
        sample("7", "Quick Walk", "15-minute walk to refresh your mind",
            Sides, 15, Easy, ["Energy", "Health", "Clarity"], "🚶", Energy),
        sample("8", "Hydration Break", "Drink water and take a mindful break",
            Sides, 5, Easy, ["Health", "Energy", "Wellness"], "💧", Wellness),
        sample("9", "Organize Space", "Tidy up your workspace for better focus",
            Sides, 20, Easy, ["Focus", "Order", "Clarity"], "🧹", Productivity),
        sample("10", "Evening Reading", "Wind down with a good book",
            Desserts, 30, Easy, ["Relaxation", "Knowledge", "Peace"], "📖", Mindfulness),
        sample("11", "Gratitude Journal", "Reflect on three things you're grateful for",
            Desserts, 10, Easy, ["Positivity", "Peace", "Mindfulness"], "📝", Mindfulness),
        sample("12", "Evening Reflection", "Review your day and plan for tomorrow",
            Desserts, 15, Easy, ["Clarity", "Planning", "Peace"], "🌙", Focus),
        sample("13", "Digital Detox Hour", "One hour completely away from screens",
            Special, 60, Medium, ["Mindfulness", "Peace", "Presence"], "📵", Mindfulness),
        sample("14", "Nature Connection", "Spend time outdoors connecting with nature",
            Special, 45, Easy, ["Peace", "Energy", "Wellness"], "🌳", Wellness),
        sample("15", "Creative Project", "Work on a personal creative project",
            Special, 120, Medium, ["Creativity", "Joy", "Achievement"], "🎨", Creativity),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_catalog_has_three_per_category() {
        let samples = sample_activities();
        assert_eq!(samples.len(), 15);
        for category in ActivityCategory::ALL {
            assert_eq!(samples.iter().filter(|a| a.category == category).count(), 3);
        }
        assert_eq!(samples[0].duration_minutes, 5);
    }

    #[test]
    fn legacy_duration_field_and_missing_active_flag_decode() {
        let doc = serde_json::json!({
            "id": "x",
            "name": "Walk",
            "description": "",
            "category": "sides",
            "duration": 12,
            "difficulty": "easy",
            "icon": "🚶"
        });
        let activity: Activity = serde_json::from_value(doc).unwrap();
        assert_eq!(activity.duration_minutes, 12);
        assert!(activity.is_active);
        assert!(activity.benefits.is_empty());
        assert!(activity.activity_type.is_none());
    }

    #[test]
    fn category_parses_stored_specials_key() {
        assert_eq!("specials".parse::<ActivityCategory>(), Ok(ActivityCategory::Special));
        assert_eq!("Mains".parse::<ActivityCategory>(), Ok(ActivityCategory::Mains));
        assert!("brunch".parse::<ActivityCategory>().is_err());
    }

    #[test]
    fn matches_benefits_case_insensitively() {
        let samples = sample_activities();
        let walk = samples.iter().find(|a| a.id == "7").unwrap();
        assert!(walk.matches("CLARITY"));
        assert!(!walk.matches("creativity"));
    }
}
