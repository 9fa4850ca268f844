//! `PgStore` against a real database.
//!
//! Skipped unless `SHOPCART_TEST_DATABASE_URL` is set. Migrations are applied
//! on first connect; each test uses its own users so tests can share one
//! database.

#![allow(clippy::unwrap_used, clippy::print_stderr)]

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;

use shopcart_core::{Actor, ItemId, OrderStatus, Price, Quantity};
use shopcart_integration_tests::{TEST_DATABASE_ENV, register};
use shopcart_server::db::{self, Conversion, PgStore, Store};
use shopcart_server::models::{ItemUpdate, User};
use shopcart_server::services::{AuthService, CartService, CatalogService, OrderService, ServiceError};

async fn store() -> Option<PgStore> {
    let Ok(url) = std::env::var(TEST_DATABASE_ENV) else {
        eprintln!("{TEST_DATABASE_ENV} not set, skipping");
        return None;
    };
    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    sqlx::migrate!("../server/migrations").run(&pool).await.unwrap();
    Some(PgStore::new(pool))
}

/// A unique username so concurrent tests never collide.
fn unique(prefix: &str) -> String {
    format!("{prefix}_{:x}", uuid::Uuid::new_v4().as_u64_pair().0)
}

async fn users(store: &PgStore) -> (Actor, User) {
    let (_, admin) = register(store, &unique("admin"), true).await;
    let (user, _) = register(store, &unique("user"), false).await;
    (admin, user)
}

fn price(cents: i64) -> Price {
    Price::from_cents(cents).unwrap()
}

#[tokio::test]
async fn test_pg_duplicate_username_conflicts() {
    let Some(store) = store().await else { return };
    let name = unique("dup");
    register(&store, &name, false).await;

    let err = AuthService::new(&store)
        .register(&name, "secret123")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_pg_cart_merge_and_snapshot() {
    let Some(store) = store().await else { return };
    let (admin, user) = users(&store).await;
    let item = CatalogService::new(&store)
        .create_item(&admin, "Laptop", Decimal::new(99_999, 2))
        .await
        .unwrap();

    let first = store
        .add_cart_item(user.id, item.id, Quantity::ONE)
        .await
        .unwrap()
        .unwrap();
    store
        .update_item(
            item.id,
            &ItemUpdate {
                price: Some(price(100)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let merged = store
        .add_cart_item(user.id, item.id, Quantity::exact(99).unwrap())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(merged.id, first.id);
    assert_eq!(merged.quantity.get(), Quantity::MAX);
    assert_eq!(merged.unit_price, price(99_999));

    let saturated = store
        .add_cart_item(user.id, item.id, Quantity::exact(5).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saturated.quantity.get(), Quantity::MAX);
}

#[tokio::test]
async fn test_pg_unknown_item_writes_nothing() {
    let Some(store) = store().await else { return };
    let (_, user) = users(&store).await;

    let added = store
        .add_cart_item(user.id, ItemId::new(i32::MAX), Quantity::ONE)
        .await
        .unwrap();
    assert!(added.is_none());
    assert!(store.find_cart(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pg_conversion() {
    let Some(store) = store().await else { return };
    let (admin, user) = users(&store).await;
    let catalog = CatalogService::new(&store);
    let laptop = catalog
        .create_item(&admin, "Laptop", Decimal::new(99_999, 2))
        .await
        .unwrap();
    let phone = catalog
        .create_item(&admin, "Phone", Decimal::new(49_999, 2))
        .await
        .unwrap();

    let carts = CartService::new(&store);
    carts.add_item(user.id, laptop.id, 1).await.unwrap();
    carts.add_item(user.id, phone.id, 2).await.unwrap();

    let placed = OrderService::new(&store).create_order(user.id).await.unwrap();
    assert_eq!(placed.total, price(199_997));
    assert_eq!(placed.order.status, OrderStatus::Completed);
    assert!(store.find_cart(user.id).await.unwrap().is_none());

    let detail = store.get_order(placed.order.id).await.unwrap().unwrap();
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.order.total, price(199_997));

    catalog.delete_item(&admin, laptop.id).await.unwrap();
    let detail = store.get_order(placed.order.id).await.unwrap().unwrap();
    let laptop_line = detail
        .items
        .iter()
        .find(|line| line.item_name == "Laptop")
        .unwrap();
    assert_eq!(laptop_line.item_id, None);
    assert_eq!(laptop_line.unit_price, price(99_999));

    let processing = store
        .update_order_status(placed.order.id, OrderStatus::Processing)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(processing.status, OrderStatus::Processing);

    let updated = store
        .update_order_status(placed.order.id, OrderStatus::Cancelled)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Cancelled);

    let all = store.list_orders_with_users().await.unwrap();
    assert!(all.iter().any(|o| o.order.id == placed.order.id && o.user.id == user.id));
}

#[tokio::test]
async fn test_pg_empty_cart_is_kept() {
    let Some(store) = store().await else { return };
    let (_, user) = users(&store).await;

    assert!(matches!(
        store.convert_cart(user.id, OrderStatus::INITIAL).await.unwrap(),
        Conversion::NoCart
    ));
    let cart = store.find_or_create_cart(user.id).await.unwrap();
    assert!(matches!(
        store.convert_cart(user.id, OrderStatus::INITIAL).await.unwrap(),
        Conversion::EmptyCart
    ));
    assert_eq!(store.find_cart(user.id).await.unwrap().unwrap().id, cart.id);
}

#[tokio::test]
async fn test_pg_concurrent_conversions_place_one_order() {
    let Some(store) = store().await else { return };
    let (admin, user) = users(&store).await;
    let item = CatalogService::new(&store)
        .create_item(&admin, "Tablet", Decimal::new(39_999, 2))
        .await
        .unwrap();
    CartService::new(&store)
        .add_item(user.id, item.id, 1)
        .await
        .unwrap();

    let store: Arc<dyn Store> = Arc::new(store);
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { OrderService::new(store.as_ref()).create_order(user.id).await })
        })
        .collect();

    let mut placed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(ServiceError::NotFound(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(placed, 1);
    assert_eq!(store.list_orders_for_user(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_pg_concurrent_first_adds_share_one_cart() {
    let Some(store) = store().await else { return };
    let (admin, user) = users(&store).await;
    let item = CatalogService::new(&store)
        .create_item(&admin, "Camera", Decimal::new(59_999, 2))
        .await
        .unwrap();

    let store: Arc<dyn Store> = Arc::new(store);
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_cart_item(user.id, item.id, Quantity::ONE).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap().unwrap();
    }

    let cart = store.find_cart(user.id).await.unwrap().unwrap();
    let lines = store.list_cart_lines(cart.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity.get(), 8);
}
