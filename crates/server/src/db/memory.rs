//! In-process [`Store`] backed by `BTreeMap` tables.
//!
//! Every mutating operation holds the write lock for its whole duration, so
//! each method is atomic and concurrent writers are serialized the way row
//! locks serialize them in `PostgreSQL`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use shopcart_core::{
    CartId, CartItemId, ItemId, OrderId, OrderLineId, OrderStatus, Quantity, UserId, Username,
    pricing,
};

use super::{Conversion, RepositoryError, Store};
use crate::models::{
    Cart, CartItem, CartLine, Item, ItemUpdate, NewItem, Order, OrderDetail, OrderLine,
    OrderWithUser, PlacedOrder, User,
};

struct UserRecord {
    user: User,
    password_hash: String,
    token: Option<String>,
}

/// Monotonic ID source for one table, starting at 1 like a `SERIAL` column.
#[derive(Default)]
struct Sequence(i32);

impl Sequence {
    fn next_id<T: From<i32>>(&mut self) -> T {
        self.0 += 1;
        T::from(self.0)
    }
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    items: BTreeMap<ItemId, Item>,
    carts: BTreeMap<CartId, Cart>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    order_lines: BTreeMap<OrderLineId, OrderLine>,

    user_seq: Sequence,
    item_seq: Sequence,
    cart_seq: Sequence,
    cart_item_seq: Sequence,
    order_seq: Sequence,
    order_line_seq: Sequence,
}

impl Tables {
    fn cart_for(&self, user_id: UserId) -> Option<&Cart> {
        self.carts.values().find(|cart| cart.user_id == user_id)
    }

    fn cart_or_create(&mut self, user_id: UserId) -> Cart {
        if let Some(cart) = self.cart_for(user_id) {
            return cart.clone();
        }
        let cart = Cart {
            id: self.cart_seq.next_id(),
            user_id,
            created_at: Utc::now(),
        };
        self.carts.insert(cart.id, cart.clone());
        cart
    }

    fn line_owner(&self, cart_item: &CartItem) -> Option<UserId> {
        self.carts.get(&cart_item.cart_id).map(|cart| cart.user_id)
    }

    fn lines_of(&self, cart_id: CartId) -> Vec<CartLine> {
        self.cart_items
            .values()
            .filter(|ci| ci.cart_id == cart_id)
            .filter_map(|ci| {
                self.items
                    .get(&ci.item_id)
                    .map(|item| CartLine::new(ci.clone(), item.clone()))
            })
            .collect()
    }
}

/// In-memory store for development and tests.
///
/// Data lives only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(
        &self,
        username: &Username,
        password_hash: &str,
        admin: bool,
    ) -> Result<User, RepositoryError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|r| r.user.username == *username) {
            return Err(RepositoryError::Conflict("username already exists".into()));
        }
        let user = User {
            id: t.user_seq.next_id(),
            username: username.clone(),
            admin,
            created_at: Utc::now(),
        };
        t.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
                token: None,
            },
        );
        Ok(user)
    }

    async fn get_user_with_password(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t
            .users
            .values()
            .find(|r| r.user.username == *username)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn set_user_token(&self, user_id: UserId, token: &str) -> Result<(), RepositoryError> {
        let mut t = self.tables.write().await;
        let record = t.users.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;
        record.token = Some(token.to_owned());
        Ok(())
    }

    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.users
            .values()
            .find(|r| r.token.as_deref() == Some(token))
            .map(|r| r.user.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.users.values().map(|r| r.user.clone()).collect())
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        let t = self.tables.read().await;
        i64::try_from(t.users.len())
            .map_err(|_| RepositoryError::DataCorruption("user count overflow".into()))
    }

    async fn create_item(&self, item: &NewItem) -> Result<Item, RepositoryError> {
        let mut t = self.tables.write().await;
        let item = Item {
            id: t.item_seq.next_id(),
            name: item.name.clone(),
            price: item.price,
        };
        t.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        Ok(self.tables.read().await.items.values().cloned().collect())
    }

    async fn update_item(
        &self,
        id: ItemId,
        update: &ItemUpdate,
    ) -> Result<Option<Item>, RepositoryError> {
        let mut t = self.tables.write().await;
        Ok(t.items.get_mut(&id).map(|item| {
            update.apply_to(item);
            item.clone()
        }))
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError> {
        let mut t = self.tables.write().await;
        if t.items.remove(&id).is_none() {
            return Ok(false);
        }
        t.cart_items.retain(|_, ci| ci.item_id != id);
        for line in t.order_lines.values_mut() {
            if line.item_id == Some(id) {
                line.item_id = None;
            }
        }
        Ok(true)
    }

    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.tables.read().await.cart_for(user_id).cloned())
    }

    async fn find_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&user_id) {
            return Err(RepositoryError::Conflict("user does not exist".into()));
        }
        Ok(t.cart_or_create(user_id))
    }

    async fn add_cart_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut t = self.tables.write().await;
        let Some(catalog_price) = t.items.get(&item_id).map(|item| item.price) else {
            return Ok(None);
        };
        if !t.users.contains_key(&user_id) {
            return Err(RepositoryError::Conflict("user does not exist".into()));
        }
        let cart = t.cart_or_create(user_id);

        let existing = t
            .cart_items
            .values_mut()
            .find(|ci| ci.cart_id == cart.id && ci.item_id == item_id);
        // An existing line keeps its unit price; only the quantity merges.
        if let Some(line) = existing {
            line.quantity = line.quantity.saturating_add(quantity);
            return Ok(Some(line.clone()));
        }

        let line = CartItem {
            id: t.cart_item_seq.next_id(),
            cart_id: cart.id,
            item_id,
            unit_price: catalog_price,
            quantity,
        };
        t.cart_items.insert(line.id, line.clone());
        Ok(Some(line))
    }

    async fn get_cart_item_owner(
        &self,
        id: CartItemId,
    ) -> Result<Option<(CartItem, UserId)>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.cart_items
            .get(&id)
            .and_then(|ci| t.line_owner(ci).map(|owner| (ci.clone(), owner))))
    }

    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        owner: UserId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut t = self.tables.write().await;
        let owned = t
            .cart_items
            .get(&id)
            .and_then(|ci| t.line_owner(ci))
            .is_some_and(|line_owner| line_owner == owner);
        if !owned {
            return Ok(None);
        }
        Ok(t.cart_items.get_mut(&id).map(|ci| {
            ci.quantity = quantity;
            ci.clone()
        }))
    }

    async fn remove_cart_item(
        &self,
        id: CartItemId,
        owner: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.write().await;
        let owned = t
            .cart_items
            .get(&id)
            .and_then(|ci| t.line_owner(ci))
            .is_some_and(|line_owner| line_owner == owner);
        if owned {
            t.cart_items.remove(&id);
        }
        Ok(owned)
    }

    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        Ok(self.tables.read().await.lines_of(cart_id))
    }

    async fn convert_cart(
        &self,
        user_id: UserId,
        status: OrderStatus,
    ) -> Result<Conversion, RepositoryError> {
        let mut t = self.tables.write().await;
        let Some(cart) = t.cart_for(user_id).cloned() else {
            return Ok(Conversion::NoCart);
        };
        let lines = t.lines_of(cart.id);
        if lines.is_empty() {
            return Ok(Conversion::EmptyCart);
        }

        let total = pricing::total(lines.iter().map(|line| (line.unit_price, line.quantity)));
        let order = Order {
            id: t.order_seq.next_id(),
            cart_id: cart.id,
            user_id,
            total,
            status,
            created_at: Utc::now(),
        };

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let order_line = OrderLine {
                id: t.order_line_seq.next_id(),
                order_id: order.id,
                item_id: Some(line.item.id),
                item_name: line.item.name.into_inner(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            };
            t.order_lines.insert(order_line.id, order_line.clone());
            items.push(order_line);
        }
        t.orders.insert(order.id, order.clone());
        t.cart_items.retain(|_, ci| ci.cart_id != cart.id);
        t.carts.remove(&cart.id);

        Ok(Conversion::Placed(PlacedOrder {
            order,
            items,
            total,
        }))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.orders.get(&id).map(|order| OrderDetail {
            order: order.clone(),
            items: t
                .order_lines
                .values()
                .filter(|line| line.order_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let t = self.tables.read().await;
        Ok(t.orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_orders_with_users(&self) -> Result<Vec<OrderWithUser>, RepositoryError> {
        let t = self.tables.read().await;
        t.orders
            .values()
            .map(|order| {
                let record = t.users.get(&order.user_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "order {} references missing user {}",
                        order.id, order.user_id
                    ))
                })?;
                Ok(OrderWithUser {
                    order: order.clone(),
                    user: record.user.clone(),
                })
            })
            .collect()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut t = self.tables.write().await;
        Ok(t.orders.get_mut(&id).map(|order| {
            order.status = status;
            order.clone()
        }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use shopcart_core::{ItemName, Price};

    use super::*;

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(&Username::parse(name).unwrap(), "hash", false)
            .await
            .unwrap()
    }

    async fn item(store: &MemoryStore, name: &str, cents: i64) -> Item {
        store
            .create_item(&NewItem {
                name: ItemName::parse(name).unwrap(),
                price: Price::from_cents(cents).unwrap(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        user(&store, "alice").await;
        let err = store
            .create_user(&Username::parse("alice").unwrap(), "other", false)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_add_merges_and_keeps_snapshot_price() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let laptop = item(&store, "Laptop", 99_999).await;

        let first = store
            .add_cart_item(alice.id, laptop.id, Quantity::ONE)
            .await
            .unwrap()
            .unwrap();
        store
            .update_item(
                laptop.id,
                &ItemUpdate {
                    price: Some(Price::from_cents(1).unwrap()),
                    ..ItemUpdate::default()
                },
            )
            .await
            .unwrap();
        let merged = store
            .add_cart_item(alice.id, laptop.id, Quantity::exact(2).unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity.get(), 3);
        assert_eq!(merged.unit_price, Price::from_cents(99_999).unwrap());
    }

    #[tokio::test]
    async fn test_add_unknown_item_writes_nothing() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let added = store
            .add_cart_item(alice.id, ItemId::new(42), Quantity::ONE)
            .await
            .unwrap();
        assert!(added.is_none());
        assert!(store.find_cart(alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_saturates_at_max() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let phone = item(&store, "Phone", 49_999).await;
        store
            .add_cart_item(alice.id, phone.id, Quantity::exact(99).unwrap())
            .await
            .unwrap();
        let line = store
            .add_cart_item(alice.id, phone.id, Quantity::exact(5).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.quantity.get(), Quantity::MAX);
    }

    #[tokio::test]
    async fn test_owner_conditional_mutations() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let phone = item(&store, "Phone", 49_999).await;
        let line = store
            .add_cart_item(alice.id, phone.id, Quantity::ONE)
            .await
            .unwrap()
            .unwrap();

        let by_bob = store
            .set_cart_item_quantity(line.id, bob.id, Quantity::exact(5).unwrap())
            .await
            .unwrap();
        assert!(by_bob.is_none());
        assert!(!store.remove_cart_item(line.id, bob.id).await.unwrap());
        assert!(store.remove_cart_item(line.id, alice.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_convert_moves_cart_into_order() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let laptop = item(&store, "Laptop", 99_999).await;
        let phone = item(&store, "Phone", 49_999).await;
        store
            .add_cart_item(alice.id, laptop.id, Quantity::ONE)
            .await
            .unwrap();
        store
            .add_cart_item(alice.id, phone.id, Quantity::exact(2).unwrap())
            .await
            .unwrap();

        let Conversion::Placed(placed) = store
            .convert_cart(alice.id, OrderStatus::INITIAL)
            .await
            .unwrap()
        else {
            panic!("expected an order");
        };
        assert_eq!(placed.total, Price::from_cents(199_997).unwrap());
        assert_eq!(placed.items.len(), 2);
        assert!(store.find_cart(alice.id).await.unwrap().is_none());

        let again = store
            .convert_cart(alice.id, OrderStatus::INITIAL)
            .await
            .unwrap();
        assert!(matches!(again, Conversion::NoCart));
    }

    #[tokio::test]
    async fn test_convert_empty_cart_keeps_cart() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        store.find_or_create_cart(alice.id).await.unwrap();
        let outcome = store
            .convert_cart(alice.id, OrderStatus::INITIAL)
            .await
            .unwrap();
        assert!(matches!(outcome, Conversion::EmptyCart));
        assert!(store.find_cart(alice.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_item_cascades_to_cart_and_detaches_order_lines() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let phone = item(&store, "Phone", 49_999).await;
        store
            .add_cart_item(alice.id, phone.id, Quantity::ONE)
            .await
            .unwrap();
        store
            .add_cart_item(bob.id, phone.id, Quantity::ONE)
            .await
            .unwrap();
        let Conversion::Placed(placed) = store
            .convert_cart(bob.id, OrderStatus::INITIAL)
            .await
            .unwrap()
        else {
            panic!("expected an order");
        };

        assert!(store.delete_item(phone.id).await.unwrap());

        let cart = store.find_cart(alice.id).await.unwrap().unwrap();
        assert!(store.list_cart_lines(cart.id).await.unwrap().is_empty());
        let detail = store.get_order(placed.order.id).await.unwrap().unwrap();
        assert_eq!(detail.items[0].item_id, None);
        assert_eq!(detail.items[0].item_name, "Phone");
    }

    #[tokio::test]
    async fn test_concurrent_first_adds_share_one_cart() {
        let store = Arc::new(MemoryStore::new());
        let alice = user(&store, "alice").await;
        let mut items = Vec::new();
        for n in 0..8 {
            items.push(item(&store, &format!("Item {n}"), 100).await);
        }

        let handles: Vec<_> = items
            .iter()
            .map(|it| {
                let store = Arc::clone(&store);
                let item_id = it.id;
                tokio::spawn(async move {
                    store
                        .add_cart_item(alice.id, item_id, Quantity::ONE)
                        .await
                        .unwrap()
                        .unwrap()
                })
            })
            .collect();
        let mut cart_ids = Vec::new();
        for handle in handles {
            cart_ids.push(handle.await.unwrap().cart_id);
        }
        cart_ids.dedup();
        assert_eq!(cart_ids.len(), 1);

        let cart = store.find_cart(alice.id).await.unwrap().unwrap();
        assert_eq!(store.list_cart_lines(cart.id).await.unwrap().len(), 8);
    }
}
