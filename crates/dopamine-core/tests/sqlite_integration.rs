//! End-to-end lifecycle over the SQLite document store.

use std::sync::Arc;

use dopamine_core::catalog::{seed_sample_activities, NewUserActivity};
use dopamine_core::{
    ActivityCategory, AppServices, Catalog, Config, OrderStatus, SqliteStore, StaticIdentity,
};
use chrono::{NaiveDate, NaiveTime};
use tempfile::TempDir;

fn services(dir: &TempDir) -> AppServices {
    let store = SqliteStore::open(&dir.path().join("dopamine.db")).unwrap();
    AppServices::new(
        Arc::new(store),
        Arc::new(StaticIdentity::signed_in("u1")),
        Config::default(),
    )
}

#[tokio::test]
async fn lifecycle_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let order_id = {
        let app = services(&dir);
        assert_eq!(seed_sample_activities(app.store().as_ref()).unwrap(), 15);
        app.stats.create_profile("u1", "u1@example.com", Some("Uma")).unwrap();

        let catalog = app.catalog();
        assert!(!catalog.is_fallback());
        app.carts.add_item("u1", "3", false).unwrap();
        app.carts.add_item("u1", "10", false).unwrap();
        let order = app.orders.checkout("u1", &catalog).unwrap();
        app.orders
            .mark_item_completed(&order.id, &order.items[0].id)
            .unwrap();
        order.id
    };

    let app = services(&dir);
    let order = app.orders.get_order(&order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Active);
    assert_eq!(order.completed_count(), 1);
    assert!(app.carts.fetch_or_create("u1").unwrap().is_empty());

    let done = app
        .orders
        .mark_item_completed(&order.id, &order.items[1].id)
        .unwrap();
    assert_eq!(done.status, OrderStatus::Completed);

    let stats = app.stats.statistics("u1").unwrap();
    assert_eq!(stats.total_activities_completed, 1);
    assert_eq!(stats.total_minutes, 45);
}

#[tokio::test]
async fn user_activities_join_the_catalog() {
    let dir = TempDir::new().unwrap();
    let app = services(&dir);

    let created = app
        .user_activities
        .create(
            "u1",
            NewUserActivity {
                title: "Piano practice".into(),
                category: ActivityCategory::Mains,
                duration_minutes: 25,
                scheduled_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                scheduled_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                is_on_home_screen: true,
            },
        )
        .unwrap();

    let catalog = app.catalog();
    assert_eq!(catalog.user_activities().len(), 1);

    app.carts.add_item("u1", &created.id, true).unwrap();
    let order = app.orders.checkout("u1", &catalog).unwrap();
    assert_eq!(order.items[0].activity_name, "Piano practice");
    assert_eq!(order.total_duration(), 25);

    let empty = Catalog::load(app.store().as_ref(), Some("someone-else"));
    assert!(empty.user_activities().is_empty());
}
