//! Cart operations.
//!
//! Item edits are expressed as keyed array transforms so two writers adding
//! to the same cart never overwrite each other's items.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::model::{Cart, CartItem};
use crate::catalog::ActivityResolver;
use crate::error::{Result, ValidationError};
use crate::feed::Feed;
use crate::storage::document::decode;
use crate::storage::{collections, DocumentStore, DocumentStoreExt, FieldUpdate};

pub type CartFeed = Feed<Cart>;

pub struct CartManager {
    store: Arc<dyn DocumentStore>,
}

impl CartManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating and persisting an empty one if needed.
    ///
    /// Creation is an upsert that only ensures `items` exists, so it cannot
    /// wipe items another writer added in the meantime.
    pub fn fetch_or_create(&self, user_id: &str) -> Result<Cart> {
        if let Some(cart) = self.store.get_as::<Cart>(collections::CARTS, user_id)? {
            return Ok(cart);
        }

        let cart = self.write(
            user_id,
            vec![
                FieldUpdate::array_union("items", Vec::new()),
                FieldUpdate::set_timestamp("updatedAt", Utc::now()),
            ],
        )?;
        tracing::debug!(user_id, "empty cart created");
        Ok(cart)
    }

    /// Appends a new item. The same activity may be added more than once.
    pub fn add_item(&self, user_id: &str, activity_id: &str, is_user_activity: bool) -> Result<Cart> {
        if activity_id.trim().is_empty() {
            return Err(ValidationError::empty("activityId").into());
        }

        let last_added_at = self
            .store
            .get_as::<Cart>(collections::CARTS, user_id)?
            .and_then(|cart| cart.last_added_at());
        let now = Utc::now();
        let added_at = last_added_at.map_or(now, |last| last.max(now));

        let item = CartItem {
            id: Uuid::new_v4().to_string(),
            activity_id: activity_id.to_string(),
            added_at,
            is_user_activity,
        };

        let cart = self.write(
            user_id,
            vec![
                FieldUpdate::array_union("items", vec![serde_json::to_value(&item)?]),
                FieldUpdate::set_timestamp("updatedAt", now),
            ],
        )?;
        tracing::info!(user_id, activity_id, is_user_activity, item_id = %item.id, "added to cart");
        Ok(cart)
    }

    /// Removes the item with `cart_item_id`; an unknown id changes nothing
    /// but the timestamp.
    pub fn remove_item(&self, user_id: &str, cart_item_id: &str) -> Result<Cart> {
        let cart = self.remove_items(user_id, &[cart_item_id.to_string()])?;
        tracing::info!(user_id, cart_item_id, "removed from cart");
        Ok(cart)
    }

    pub(crate) fn remove_items(&self, user_id: &str, item_ids: &[String]) -> Result<Cart> {
        let ids = item_ids.iter().cloned().map(serde_json::Value::from).collect();
        self.write(
            user_id,
            vec![
                FieldUpdate::array_remove_where("items", "id", ids),
                FieldUpdate::set_timestamp("updatedAt", Utc::now()),
            ],
        )
    }

    pub fn clear(&self, user_id: &str) -> Result<Cart> {
        let cart = self.write(
            user_id,
            vec![
                FieldUpdate::set("items", serde_json::Value::Array(Vec::new())),
                FieldUpdate::set_timestamp("updatedAt", Utc::now()),
            ],
        )?;
        tracing::info!(user_id, "cart cleared");
        Ok(cart)
    }

    pub fn total_duration(&self, cart: &Cart, resolver: &dyn ActivityResolver) -> u32 {
        cart.total_duration(resolver)
    }

    /// Feed of the user's cart. Read failures surface as an empty cart.
    pub fn subscribe(&self, user_id: &str) -> CartFeed {
        let store = Arc::clone(&self.store);
        let watched = user_id.to_string();
        let owner = user_id.to_string();

        Feed::new(
            self.store.watch(),
            move |event| event.is_for(collections::CARTS) && event.id == watched,
            move || match store.get_as::<Cart>(collections::CARTS, &owner) {
                Ok(Some(cart)) => cart,
                Ok(None) => Cart::empty(Utc::now()),
                Err(err) => {
                    tracing::warn!(user_id = %owner, error = %err, "cart feed read failed");
                    Cart::empty(Utc::now())
                }
            },
        )
    }

    fn write(&self, user_id: &str, updates: Vec<FieldUpdate>) -> Result<Cart> {
        let doc = self.store.upsert(collections::CARTS, user_id, &updates)?;
        decode(collections::CARTS, user_id, doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::CoreError;
    use crate::storage::{ChangeEvent, Document, MemoryStore, Query};
    use tokio::sync::broadcast;

    fn manager() -> CartManager {
        CartManager::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn fetch_or_create_persists_empty_cart() {
        let store = Arc::new(MemoryStore::new());
        let carts = CartManager::new(store.clone());
        let cart = carts.fetch_or_create("u").unwrap();
        assert!(cart.is_empty());
        assert_eq!(store.len(collections::CARTS), 1);
    }

    #[test]
    fn add_then_remove_first_leaves_second() {
        let carts = manager();
        let first = carts.add_item("u", "1", false).unwrap().items[0].id.clone();
        carts.add_item("u", "4", false).unwrap();

        let cart = carts.remove_item("u", &first).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].activity_id, "4");
    }

    #[test]
    fn added_at_is_non_decreasing() {
        let carts = manager();
        for id in ["1", "2", "3", "2"] {
            carts.add_item("u", id, false).unwrap();
        }
        let cart = carts.fetch_or_create("u").unwrap();
        assert_eq!(cart.items.len(), 4);
        assert!(cart.items.windows(2).all(|w| w[0].added_at <= w[1].added_at));
    }

    #[test]
    fn empty_activity_id_is_rejected() {
        let err = manager().add_item("u", " ", false).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let carts = manager();
        carts.add_item("u", "1", false).unwrap();
        let cart = carts.remove_item("u", "missing").unwrap();
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn clear_empties_cart() {
        let carts = manager();
        carts.add_item("u", "1", false).unwrap();
        let cart = carts.clear("u").unwrap();
        assert!(cart.is_empty());
        assert_eq!(carts.total_duration(&cart, &Catalog::samples()), 0);
    }

    /// Store whose cart reads always miss, as a writer that looked before
    /// another writer created the cart would see it.
    struct StaleCartReads(MemoryStore);

    impl DocumentStore for StaleCartReads {
        fn get(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>> {
            if collection == collections::CARTS {
                return Ok(None);
            }
            self.0.get(collection, id)
        }

        fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
            self.0.query(collection, query)
        }

        fn set(&self, collection: &str, id: &str, doc: serde_json::Value, merge: bool) -> Result<()> {
            self.0.set(collection, id, doc, merge)
        }

        fn update(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<serde_json::Value> {
            self.0.update(collection, id, updates)
        }

        fn upsert(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<serde_json::Value> {
            self.0.upsert(collection, id, updates)
        }

        fn delete(&self, collection: &str, id: &str) -> Result<bool> {
            self.0.delete(collection, id)
        }

        fn watch(&self) -> broadcast::Receiver<ChangeEvent> {
            self.0.watch()
        }
    }

    #[test]
    fn first_adds_racing_on_a_missing_cart_keep_both_items() {
        let stale = Arc::new(StaleCartReads(MemoryStore::new()));
        let carts = CartManager::new(stale.clone());

        carts.add_item("u", "1", false).unwrap();
        // The second writer still believes no cart exists.
        carts.add_item("u", "2", false).unwrap();
        carts.fetch_or_create("u").unwrap();

        let cart: Cart = stale.0.get_as(collections::CARTS, "u").unwrap().unwrap();
        let ids: Vec<&str> = cart.items.iter().map(|i| i.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn feed_yields_current_then_changes_for_owner_only() {
        let carts = manager();
        carts.add_item("u", "1", false).unwrap();

        let mut feed = carts.subscribe("u");
        assert_eq!(feed.next().await.map(|c| c.items.len()), Some(1));

        carts.add_item("someone-else", "2", false).unwrap();
        carts.add_item("u", "3", false).unwrap();
        assert_eq!(feed.next().await.map(|c| c.items.len()), Some(2));
    }

    #[tokio::test]
    async fn feed_read_failure_yields_empty_cart() {
        let store = Arc::new(MemoryStore::new());
        let carts = CartManager::new(store.clone());
        carts.add_item("u", "1", false).unwrap();

        store.fail_reads(collections::CARTS, None);
        let mut feed = carts.subscribe("u");
        let cart = feed.next().await.unwrap();
        assert!(cart.is_empty());
    }
}
