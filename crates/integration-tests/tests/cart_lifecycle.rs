//! Cart-to-order lifecycle through the services, over the in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;

use shopcart_core::{OrderStatus, Price};
use shopcart_integration_tests::register;
use shopcart_server::db::{MemoryStore, Store};
use shopcart_server::services::{CartService, CatalogService, OrderService, ServiceError};

fn price(cents: i64) -> Price {
    Price::from_cents(cents).unwrap()
}

#[tokio::test]
async fn test_full_lifecycle() {
    let store = MemoryStore::new();
    let (_, admin) = register(&store, "admin", true).await;
    let (alice, _) = register(&store, "alice", false).await;

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
    carts.add_item(alice.id, laptop.id, 1).await.unwrap();
    let line = carts.add_item(alice.id, phone.id, 1).await.unwrap();
    // Adding the same item again merges into the existing line
    let merged = carts.add_item(alice.id, phone.id, 1).await.unwrap();
    assert_eq!(merged.id, line.id);
    assert_eq!(merged.quantity.get(), 2);

    let view = carts.view_cart(alice.id).await.unwrap();
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.total, price(199_997));

    let orders = OrderService::new(&store);
    let placed = orders.create_order(alice.id).await.unwrap();
    assert_eq!(placed.total, price(199_997));
    assert_eq!(placed.items.len(), 2);
    assert_eq!(placed.order.status, OrderStatus::Completed);
    assert_eq!(placed.order.cart_id, view.cart_id);

    // The converted cart is gone; the next read starts a fresh one
    let fresh = carts.view_cart(alice.id).await.unwrap();
    assert_ne!(fresh.cart_id, view.cart_id);
    assert!(fresh.items.is_empty());
    assert_eq!(fresh.total, Price::ZERO);

    let mine = orders.list_user_orders(alice.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, placed.order.id);

    let updated = orders
        .update_order_status(&admin, placed.order.id, "shipped")
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.total, placed.total);
}

#[tokio::test]
async fn test_catalog_changes_do_not_touch_existing_lines_or_orders() {
    let store = MemoryStore::new();
    let (_, admin) = register(&store, "admin", true).await;
    let (alice, alice_actor) = register(&store, "alice", false).await;

    let catalog = CatalogService::new(&store);
    let item = catalog
        .create_item(&admin, "Camera", Decimal::new(59_999, 2))
        .await
        .unwrap();

    let carts = CartService::new(&store);
    carts.add_item(alice.id, item.id, 2).await.unwrap();

    catalog
        .update_item(&admin, item.id, None, Some(Decimal::new(1_000, 2)))
        .await
        .unwrap();

    // Existing line keeps the price captured when it was created
    let view = carts.view_cart(alice.id).await.unwrap();
    assert_eq!(view.items[0].unit_price, price(59_999));
    assert_eq!(view.items[0].item.price, price(1_000));
    assert_eq!(view.total, price(119_998));

    let placed = OrderService::new(&store).create_order(alice.id).await.unwrap();
    assert_eq!(placed.total, price(119_998));

    // Deleting the item leaves the order and its line snapshot intact
    catalog.delete_item(&admin, item.id).await.unwrap();
    let detail = OrderService::new(&store)
        .get_order(&alice_actor, placed.order.id)
        .await
        .unwrap();
    assert_eq!(detail.order.total, price(119_998));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].item_id, None);
    assert_eq!(detail.items[0].item_name, "Camera");
    assert_eq!(detail.items[0].unit_price, price(59_999));
}

#[tokio::test]
async fn test_deleted_item_leaves_carts() {
    let store = MemoryStore::new();
    let (_, admin) = register(&store, "admin", true).await;
    let (alice, _) = register(&store, "alice", false).await;

    let catalog = CatalogService::new(&store);
    let item = catalog
        .create_item(&admin, "Speaker", Decimal::new(14_999, 2))
        .await
        .unwrap();
    let carts = CartService::new(&store);
    carts.add_item(alice.id, item.id, 1).await.unwrap();

    catalog.delete_item(&admin, item.id).await.unwrap();

    let view = carts.view_cart(alice.id).await.unwrap();
    assert!(view.items.is_empty());
    let err = OrderService::new(&store).create_order(alice.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_carts_are_isolated_per_user() {
    let store = MemoryStore::new();
    let (_, admin) = register(&store, "admin", true).await;
    let (alice, _) = register(&store, "alice", false).await;
    let (bob, bob_actor) = register(&store, "bob", false).await;

    let item = CatalogService::new(&store)
        .create_item(&admin, "Tablet", Decimal::new(39_999, 2))
        .await
        .unwrap();

    let carts = CartService::new(&store);
    let alice_line = carts.add_item(alice.id, item.id, 3).await.unwrap();

    let err = carts
        .update_item_quantity(bob.id, alice_line.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Authorization(_)));
    let err = carts.remove_item(bob.id, alice_line.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Authorization(_)));

    let alice_view = carts.view_cart(alice.id).await.unwrap();
    assert_eq!(alice_view.items[0].quantity.get(), 3);

    let placed = OrderService::new(&store).create_order(alice.id).await.unwrap();
    let err = OrderService::new(&store)
        .get_order(&bob_actor, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Authorization(_)));
    let err = OrderService::new(&store)
        .list_all_orders(&bob_actor)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Authorization(_)));

    let all = OrderService::new(&store).list_all_orders(&admin).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].user.username.as_str(), "alice");
}

#[tokio::test]
async fn test_concurrent_adds_never_exceed_limit() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let (_, admin) = register(store.as_ref(), "admin", true).await;
    let (alice, _) = register(store.as_ref(), "alice", false).await;
    let item = CatalogService::new(store.as_ref())
        .create_item(&admin, "Monitor", Decimal::new(24_999, 2))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                CartService::new(store.as_ref())
                    .add_item(alice.id, item.id, 10)
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let view = CartService::new(store.as_ref())
        .view_cart(alice.id)
        .await
        .unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity.get(), 100);
}
