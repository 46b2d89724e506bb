use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ActivityResolver;

/// A selected activity waiting in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub activity_id: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub is_user_activity: bool,
}

/// Per-user staging area, stored under the user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            items: Vec::new(),
            updated_at: at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of resolvable item durations; dangling references add nothing.
    pub fn total_duration(&self, resolver: &dyn ActivityResolver) -> u32 {
        self.items
            .iter()
            .filter_map(|item| resolver.resolve(&item.activity_id, item.is_user_activity))
            .fold(0u32, |total, activity| total.saturating_add(activity.duration_minutes))
    }

    /// Latest `addedAt` in the cart.
    pub fn last_added_at(&self) -> Option<DateTime<Utc>> {
        self.items.iter().map(|item| item.added_at).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn item(id: &str, activity_id: &str, is_user_activity: bool) -> CartItem {
        CartItem {
            id: id.to_string(),
            activity_id: activity_id.to_string(),
            added_at: Utc::now(),
            is_user_activity,
        }
    }

    #[test]
    fn dangling_items_contribute_zero() {
        let cart = Cart {
            items: vec![item("a", "1", false), item("b", "gone", false), item("c", "4", false)],
            updated_at: Utc::now(),
        };
        assert_eq!(cart.total_duration(&Catalog::samples()), 95);
    }

    #[test]
    fn stored_cart_without_user_flag_decodes() {
        let doc = serde_json::json!({
            "items": [{"id": "x", "activityId": "1", "addedAt": "2025-10-21T08:00:00Z"}],
            "updatedAt": "2025-10-21T08:00:00Z"
        });
        let cart: Cart = serde_json::from_value(doc).unwrap();
        assert!(!cart.items[0].is_user_activity);
    }
}
