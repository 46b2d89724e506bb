use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order state.
///
/// `Pending` is reserved and never produced by checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Active => "active",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frozen snapshot of one checked-out activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub activity_id: String,
    pub activity_name: String,
    /// Minutes, copied at checkout.
    pub duration: u32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Set once, on the first transition into `Completed`.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn total_duration(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.duration))
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_completed).count()
    }

    /// 0 for an empty order.
    pub fn completion_percentage(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.items.len() as f64 * 100.0
    }

    pub fn all_completed(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.is_completed)
    }

    pub fn item(&self, item_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(completed: &[bool]) -> Order {
        Order {
            id: "o".into(),
            user_id: "u".into(),
            items: completed
                .iter()
                .enumerate()
                .map(|(i, &done)| OrderItem {
                    id: format!("i{i}"),
                    activity_id: format!("{}", i + 1),
                    activity_name: "x".into(),
                    duration: 10 * (i as u32 + 1),
                    is_completed: done,
                    completed_at: None,
                })
                .collect(),
            status: OrderStatus::Active,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn empty_order_is_zero_percent_and_not_complete() {
        let empty = order(&[]);
        assert_eq!(empty.completion_percentage(), 0.0);
        assert!(!empty.all_completed());
        assert_eq!(empty.total_duration(), 0);
    }

    #[test]
    fn percentage_counts_completed_items() {
        let o = order(&[true, false, false, true]);
        assert_eq!(o.completion_percentage(), 50.0);
        assert_eq!(o.total_duration(), 100);
        assert!(!o.all_completed());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(OrderStatus::Cancelled).unwrap(), "cancelled");
        assert_eq!(OrderStatus::Active.to_string(), "active");
    }
}
