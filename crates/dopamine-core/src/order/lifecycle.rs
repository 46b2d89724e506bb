//! Checkout and per-item completion.
//!
//! State machine:
//! - `checkout` turns the cart into an `Active` order
//! - completing the last open item moves it to `Completed`
//! - reopening an item moves a `Completed` order back to `Active`
//! - `cancel` moves an open order to `Cancelled`

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::model::{Order, OrderItem, OrderStatus};
use crate::cart::CartManager;
use crate::catalog::ActivityResolver;
use crate::error::{CoreError, Result, StorageError, ValidationError};
use crate::feed::Feed;
use crate::stats::CompletionRecorder;
use crate::storage::{
    collections, ChangeKind, CheckoutConfig, DocumentStore, DocumentStoreExt, FieldUpdate, Filter,
    OrderBy, Query,
};

pub type OrderFeed = Feed<Vec<Order>>;

pub struct OrderLifecycle {
    store: Arc<dyn DocumentStore>,
    carts: CartManager,
    recorder: Arc<dyn CompletionRecorder>,
    config: CheckoutConfig,
    // Serializes read-modify-write of order documents in this process.
    writes: Mutex<()>,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        recorder: Arc<dyn CompletionRecorder>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            carts: CartManager::new(Arc::clone(&store)),
            store,
            recorder,
            config,
            writes: Mutex::new(()),
        }
    }

    /// Convert the user's cart into an active order.
    ///
    /// Each cart item is frozen into an [`OrderItem`]; items the resolver
    /// cannot find are skipped. After the order is written, exactly the
    /// checked-out cart items are removed. If that removal keeps failing the
    /// order is deleted again and the storage error is returned.
    ///
    /// # Errors
    /// `EmptyCart` when the cart has nothing that resolves; no order is
    /// written and the cart is left as it was.
    pub fn checkout(&self, user_id: &str, resolver: &dyn ActivityResolver) -> Result<Order> {
        let cart = self.carts.fetch_or_create(user_id)?;
        if cart.is_empty() {
            return Err(CoreError::EmptyCart {
                user_id: user_id.to_string(),
            });
        }

        let mut items = Vec::with_capacity(cart.items.len());
        for cart_item in &cart.items {
            match resolver.resolve(&cart_item.activity_id, cart_item.is_user_activity) {
                Some(activity) => items.push(OrderItem {
                    id: Uuid::new_v4().to_string(),
                    activity_id: activity.id,
                    activity_name: activity.name,
                    duration: activity.duration_minutes,
                    is_completed: false,
                    completed_at: None,
                }),
                None => tracing::warn!(
                    user_id,
                    activity_id = %cart_item.activity_id,
                    is_user_activity = cart_item.is_user_activity,
                    "skipping unresolvable cart item"
                ),
            }
        }

        if items.is_empty() {
            return Err(CoreError::EmptyCart {
                user_id: user_id.to_string(),
            });
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            items,
            status: OrderStatus::Active,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.store.put(collections::ORDERS, &order.id, &order)?;

        let snapshot: Vec<String> = cart.items.iter().map(|item| item.id.clone()).collect();
        let mut attempt = 0;
        loop {
            match self.carts.remove_items(user_id, &snapshot) {
                Ok(_) => break,
                Err(err) if attempt < self.config.clear_retries => {
                    attempt += 1;
                    tracing::warn!(user_id, attempt, error = %err, "retrying cart clear after checkout");
                }
                Err(err) => {
                    tracing::error!(user_id, order_id = %order.id, error = %err, "cart clear failed, rolling back order");
                    if let Err(rollback) = self.store.delete(collections::ORDERS, &order.id) {
                        tracing::error!(order_id = %order.id, error = %rollback, "order rollback failed");
                    }
                    return Err(err);
                }
            }
        }

        tracing::info!(
            user_id,
            order_id = %order.id,
            items = order.items.len(),
            total_minutes = order.total_duration(),
            "order created"
        );
        Ok(order)
    }

    pub fn get_order(&self, order_id: &str) -> Result<Order> {
        self.store
            .get_as::<Order>(collections::ORDERS, order_id)?
            .ok_or_else(|| CoreError::not_found("order", order_id))
    }

    /// Newest first.
    pub fn list_orders(&self, user_id: &str) -> Result<Vec<Order>> {
        list_for(self.store.as_ref(), user_id)
    }

    /// Mark one item done. Completing the last open item completes the
    /// order, and the first such completion reports the order's total
    /// duration to the statistics engine. Repeating the call is a no-op.
    pub fn mark_item_completed(&self, order_id: &str, item_id: &str) -> Result<Order> {
        let (order, first_completion) = {
            let _guard = self.lock()?;
            let mut order = self.get_order(order_id)?;
            ensure_open(&order)?;
            let index = item_index(&order, item_id)?;

            if order.items[index].is_completed {
                tracing::debug!(order_id, item_id, "item already completed");
                return Ok(order);
            }

            let now = Utc::now();
            order.items[index].is_completed = true;
            order.items[index].completed_at = Some(now);

            let mut first_completion = false;
            if order.all_completed() {
                order.status = OrderStatus::Completed;
                if order.completed_at.is_none() {
                    order.completed_at = Some(now);
                    first_completion = true;
                }
            }

            self.persist(&order)?;
            (order, first_completion)
        };

        tracing::debug!(order_id, item_id, "order item completed");
        if first_completion {
            tracing::info!(order_id, user_id = %order.user_id, minutes = order.total_duration(), "order completed");
            if let Err(err) = self
                .recorder
                .record_completion(&order.user_id, order.total_duration())
            {
                tracing::warn!(order_id, user_id = %order.user_id, error = %err, "statistics update failed after completion");
            }
        }
        Ok(order)
    }

    /// Reopen an item. A completed order becomes active again; its
    /// `completedAt` and the statistics already recorded stay as they are.
    pub fn mark_item_incomplete(&self, order_id: &str, item_id: &str) -> Result<Order> {
        let _guard = self.lock()?;
        let mut order = self.get_order(order_id)?;
        ensure_open(&order)?;
        let index = item_index(&order, item_id)?;

        if !order.items[index].is_completed {
            return Ok(order);
        }

        order.items[index].is_completed = false;
        order.items[index].completed_at = None;
        if order.status == OrderStatus::Completed {
            order.status = OrderStatus::Active;
        }

        self.persist(&order)?;
        tracing::debug!(order_id, item_id, "order item reopened");
        Ok(order)
    }

    /// Cancel an order that has not been completed.
    pub fn cancel(&self, order_id: &str) -> Result<Order> {
        let _guard = self.lock()?;
        let mut order = self.get_order(order_id)?;
        match order.status {
            OrderStatus::Cancelled => return Ok(order),
            OrderStatus::Completed => {
                return Err(ValidationError::invalid("status", "a completed order cannot be cancelled").into())
            }
            OrderStatus::Pending | OrderStatus::Active => {}
        }

        order.status = OrderStatus::Cancelled;
        self.persist(&order)?;
        tracing::info!(order_id, "order cancelled");
        Ok(order)
    }

    /// Remove an order at any status. Statistics are not touched.
    pub fn delete_order(&self, user_id: &str, order_id: &str) -> Result<()> {
        let _guard = self.lock()?;
        let order = self.get_order(order_id)?;
        if order.user_id != user_id {
            return Err(CoreError::not_found("order", order_id));
        }
        self.store.delete(collections::ORDERS, order_id)?;
        tracing::info!(user_id, order_id, "order deleted");
        Ok(())
    }

    /// Feed of the user's orders, newest first. Read failures surface as an
    /// empty list.
    pub fn subscribe(&self, user_id: &str) -> OrderFeed {
        let known: Arc<Mutex<HashSet<String>>> = Arc::default();

        let matches = {
            let store = Arc::clone(&self.store);
            let known = Arc::clone(&known);
            let owner = user_id.to_string();
            move |event: &crate::storage::ChangeEvent| {
                if !event.is_for(collections::ORDERS) {
                    return false;
                }
                let seen = known.lock().map(|ids| ids.contains(&event.id)).unwrap_or(true);
                if seen || event.kind == ChangeKind::Deleted {
                    return seen;
                }
                match store.get(collections::ORDERS, &event.id) {
                    Ok(Some(doc)) => doc.get("userId") == Some(&Value::from(owner.as_str())),
                    Ok(None) => false,
                    Err(_) => true,
                }
            }
        };

        let read = {
            let store = Arc::clone(&self.store);
            let owner = user_id.to_string();
            move || {
                let orders = list_for(store.as_ref(), &owner).unwrap_or_else(|err| {
                    tracing::warn!(user_id = %owner, error = %err, "order feed read failed");
                    Vec::new()
                });
                if let Ok(mut ids) = known.lock() {
                    *ids = orders.iter().map(|o| o.id.clone()).collect();
                }
                orders
            }
        };

        Feed::new(self.store.watch(), matches, read)
    }

    fn persist(&self, order: &Order) -> Result<()> {
        let completed_at = match order.completed_at {
            Some(at) => crate::storage::document::timestamp(at),
            None => Value::Null,
        };
        self.store.update(
            collections::ORDERS,
            &order.id,
            &[
                FieldUpdate::set("items", serde_json::to_value(&order.items)?),
                FieldUpdate::set("status", order.status.as_str()),
                FieldUpdate::set("completedAt", completed_at),
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.writes
            .lock()
            .map_err(|_| StorageError::Unavailable("order write lock poisoned".into()).into())
    }
}

fn list_for(store: &dyn DocumentStore, user_id: &str) -> Result<Vec<Order>> {
    store.query_as(
        collections::ORDERS,
        &Query::new()
            .filter(Filter::eq("userId", user_id))
            .order_by(OrderBy::desc("createdAt")),
    )
}

fn item_index(order: &Order, item_id: &str) -> Result<usize> {
    order
        .items
        .iter()
        .position(|item| item.id == item_id)
        .ok_or_else(|| CoreError::not_found("order item", item_id))
}

fn ensure_open(order: &Order) -> Result<()> {
    if order.status == OrderStatus::Cancelled {
        return Err(ValidationError::invalid("status", format!("order {} is cancelled", order.id)).into());
    }
    Ok(())
}
