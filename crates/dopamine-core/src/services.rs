//! Session wiring: every service built once over one store.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::cart::CartManager;
use crate::catalog::{Catalog, MenuConfiguration, UserActivityStore};
use crate::error::{CoreError, Result};
use crate::identity::IdentityProvider;
use crate::order::OrderLifecycle;
use crate::stats::{CompletionRecorder, StatisticsEngine};
use crate::storage::{Config, DocumentStore};
use crate::timer::{LiveActivitySink, LiveCountdowns, TracingSink};

pub struct AppServices {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    config: Config,
    pub carts: CartManager,
    pub orders: OrderLifecycle,
    pub stats: Arc<StatisticsEngine>,
    pub user_activities: UserActivityStore,
    pub timers: LiveCountdowns,
}

impl AppServices {
    /// Wire services with a logging-only live display.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Config,
    ) -> Self {
        Self::with_sink(store, identity, config, Handle::current(), Arc::new(TracingSink))
    }

    pub fn with_sink(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Config,
        runtime: Handle,
        sink: Arc<dyn LiveActivitySink>,
    ) -> Self {
        let stats = Arc::new(StatisticsEngine::new(Arc::clone(&store), config.profile.clone()));
        let orders = OrderLifecycle::new(
            Arc::clone(&store),
            Arc::clone(&stats) as Arc<dyn CompletionRecorder>,
            config.checkout.clone(),
        );

        Self {
            carts: CartManager::new(Arc::clone(&store)),
            orders,
            stats,
            user_activities: UserActivityStore::new(Arc::clone(&store)),
            timers: LiveCountdowns::new(runtime, sink, &config.timer),
            store,
            identity,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The signed-in user's id, or [`CoreError::NotAuthenticated`].
    pub fn require_user(&self) -> Result<String> {
        self.identity.user_id().ok_or(CoreError::NotAuthenticated)
    }

    /// Catalog for the signed-in user, or system activities only when
    /// anonymous.
    pub fn catalog(&self) -> Catalog {
        let user_id = self.identity.user_id();
        Catalog::load(self.store.as_ref(), user_id.as_deref())
    }

    pub fn menu(&self) -> MenuConfiguration {
        MenuConfiguration::load(self.store.as_ref())
    }

    /// Stop every live countdown. Identity itself is owned by the caller.
    pub fn sign_out(&self) -> usize {
        let stopped = self.timers.stop_all();
        tracing::info!(stopped, "signed out");
        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::storage::MemoryStore;

    fn services(identity: StaticIdentity) -> AppServices {
        AppServices::new(
            Arc::new(MemoryStore::new()),
            Arc::new(identity),
            Config::default(),
        )
    }

    #[tokio::test]
    async fn anonymous_session_requires_user() {
        let app = services(StaticIdentity::anonymous());
        assert!(matches!(app.require_user(), Err(CoreError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn completion_reaches_statistics() {
        let app = services(StaticIdentity::signed_in("u"));
        let user = app.require_user().unwrap();
        app.stats.create_profile(&user, "u@example.com", None).unwrap();

        let catalog = Catalog::samples();
        app.carts.add_item(&user, "1", false).unwrap();
        let order = app.orders.checkout(&user, &catalog).unwrap();
        app.orders.mark_item_completed(&order.id, &order.items[0].id).unwrap();

        let stats = app.stats.statistics(&user).unwrap();
        assert_eq!(stats.total_activities_completed, 1);
        assert_eq!(stats.total_minutes, u64::from(order.items[0].duration));
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_stops_timers() {
        let app = services(StaticIdentity::signed_in("u"));
        app.timers.start("1", "Walk", "🚶", 5);
        app.timers.start("2", "Read", "📚", 5);
        assert_eq!(app.sign_out(), 2);
        assert!(app.timers.active_ids().is_empty());
    }
}
