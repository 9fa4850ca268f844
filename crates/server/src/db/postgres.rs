//! `PostgreSQL` [`Store`] implementation.
//!
//! Queries are checked at runtime (`sqlx::query_as::<_, Row>`) and decoded
//! into private row types, which are then validated into domain types.
//! A row that fails validation is reported as
//! [`RepositoryError::DataCorruption`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shopcart_core::{
    CartId, CartItemId, ItemId, ItemName, OrderId, OrderLineId, OrderStatus, Price, Quantity,
    UserId, Username, pricing,
};

use super::{Conversion, RepositoryError, Store};
use crate::models::{
    Cart, CartItem, CartLine, Item, ItemUpdate, NewItem, Order, OrderDetail, OrderLine,
    OrderWithUser, PlacedOrder, User,
};

// =============================================================================
// Internal Row Types
// =============================================================================

fn price_column(value: Decimal, column: &str) -> Result<Price, RepositoryError> {
    Price::new(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

fn quantity_column(value: i32) -> Result<Quantity, RepositoryError> {
    Quantity::exact(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid quantity in database: {e}")))
}

fn username_column(value: &str) -> Result<Username, RepositoryError> {
    Username::parse(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid username in database: {e}")))
}

fn item_name_column(value: &str) -> Result<ItemName, RepositoryError> {
    ItemName::parse(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid item name in database: {e}")))
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    admin: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id),
            username: username_column(&row.username)?,
            admin: row.admin,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    id: i32,
    username: String,
    admin: bool,
    created_at: DateTime<Utc>,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i32,
    name: String,
    price: Decimal,
}

impl TryFrom<ItemRow> for Item {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ItemId::new(row.id),
            name: item_name_column(&row.name)?,
            price: price_column(row.price, "price")?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    cart_id: i32,
    item_id: i32,
    unit_price: Decimal,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            item_id: ItemId::new(row.item_id),
            unit_price: price_column(row.unit_price, "unit price")?,
            quantity: quantity_column(row.quantity)?,
        })
    }
}

/// A cart line joined with the user owning its cart.
#[derive(Debug, sqlx::FromRow)]
struct OwnedCartItemRow {
    #[sqlx(flatten)]
    line: CartItemRow,
    owner_id: i32,
}

/// A cart line joined with its catalog item.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    line: CartItemRow,
    item_name: String,
    item_price: Decimal,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let cart_item = CartItem::try_from(row.line)?;
        let item = Item {
            id: cart_item.item_id,
            name: item_name_column(&row.item_name)?,
            price: price_column(row.item_price, "price")?,
        };
        Ok(Self::new(cart_item, item))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    cart_id: i32,
    user_id: i32,
    total: Decimal,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            user_id: UserId::new(row.user_id),
            total: price_column(row.total, "order total")?,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i32,
    order_id: i32,
    item_id: Option<i32>,
    item_name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderLineId::new(row.id),
            order_id: OrderId::new(row.order_id),
            item_id: row.item_id.map(ItemId::new),
            item_name: row.item_name,
            unit_price: price_column(row.unit_price, "unit price")?,
            quantity: quantity_column(row.quantity)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderWithUserRow {
    #[sqlx(flatten)]
    order: OrderRow,
    username: String,
    admin: bool,
    user_created_at: DateTime<Utc>,
}

impl TryFrom<OrderWithUserRow> for OrderWithUser {
    type Error = RepositoryError;

    fn try_from(row: OrderWithUserRow) -> Result<Self, Self::Error> {
        let order = Order::try_from(row.order)?;
        let user = User {
            id: order.user_id,
            username: username_column(&row.username)?,
            admin: row.admin,
            created_at: row.user_created_at,
        };
        Ok(Self { order, user })
    }
}

const USER_COLUMNS: &str = "id, username, admin, created_at";
const CART_ITEM_COLUMNS: &str = "id, cart_id, item_id, unit_price, quantity";
const ORDER_COLUMNS: &str = "id, cart_id, user_id, total, status, created_at";
const ORDER_LINE_COLUMNS: &str = "id, order_id, item_id, item_name, unit_price, quantity";

fn conflict_on_violation(e: sqlx::Error, unique: &str, foreign_key: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(unique.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict(foreign_key.to_owned());
        }
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL`-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(
        &self,
        username: &Username,
        password_hash: &str,
        admin: bool,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO shop.users (username, password_hash, admin)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username.as_str())
        .bind(password_hash)
        .bind(admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("username already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn get_user_with_password(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM shop.users WHERE username = $1"
        ))
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let user = User::try_from(UserRow {
                id: row.id,
                username: row.username,
                admin: row.admin,
                created_at: row.created_at,
            })?;
            Ok::<_, RepositoryError>((user, row.password_hash))
        })
        .transpose()
    }

    async fn set_user_token(&self, user_id: UserId, token: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shop.users SET token = $2 WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM shop.users WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM shop.users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shop.users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_item(&self, item: &NewItem) -> Result<Item, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(
            "INSERT INTO shop.items (name, price) VALUES ($1, $2) RETURNING id, name, price",
        )
        .bind(item.name.as_str())
        .bind(item.price.amount())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT id, name, price FROM shop.items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>("SELECT id, name, price FROM shop.items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_item(
        &self,
        id: ItemId,
        update: &ItemUpdate,
    ) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(
            "UPDATE shop.items
             SET name = COALESCE($2, name),
                 price = COALESCE($3, price),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING id, name, price",
        )
        .bind(id)
        .bind(update.name.as_ref().map(ItemName::as_str))
        .bind(update.price.map(|p| p.amount()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError> {
        // cart_items cascade; order_lines.item_id is set to NULL
        let result = sqlx::query("DELETE FROM shop.items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at FROM shop.carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = upsert_cart(&self.pool, user_id).await?;
        Ok(row.into())
    }

    async fn add_cart_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let catalog_price =
            sqlx::query_scalar::<_, Decimal>("SELECT price FROM shop.items WHERE id = $1")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(catalog_price) = catalog_price else {
            tx.rollback().await?;
            return Ok(None);
        };
        let catalog_price = price_column(catalog_price, "price")?;

        let cart = upsert_cart(&mut *tx, user_id).await?;

        // An existing line keeps its unit price; only the quantity merges.
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "INSERT INTO shop.cart_items (cart_id, item_id, unit_price, quantity)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (cart_id, item_id) DO UPDATE
             SET quantity = LEAST(shop.cart_items.quantity + EXCLUDED.quantity, $5)
             RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(cart.id)
        .bind(item_id)
        .bind(catalog_price.amount())
        .bind(quantity.get())
        .bind(Quantity::MAX)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_violation(e, "cart line already exists", "item was removed concurrently")
        })?;

        tx.commit().await?;
        CartItem::try_from(row).map(Some)
    }

    async fn get_cart_item_owner(
        &self,
        id: CartItemId,
    ) -> Result<Option<(CartItem, UserId)>, RepositoryError> {
        let row = sqlx::query_as::<_, OwnedCartItemRow>(
            "SELECT ci.id, ci.cart_id, ci.item_id, ci.unit_price, ci.quantity,
                    c.user_id AS owner_id
             FROM shop.cart_items ci
             JOIN shop.carts c ON c.id = ci.cart_id
             WHERE ci.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let cart_item = CartItem::try_from(row.line)?;
            Ok::<_, RepositoryError>((cart_item, UserId::new(row.owner_id)))
        })
        .transpose()
    }

    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        owner: UserId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            "UPDATE shop.cart_items ci
             SET quantity = $3
             FROM shop.carts c
             WHERE ci.id = $1 AND c.id = ci.cart_id AND c.user_id = $2
             RETURNING ci.id, ci.cart_id, ci.item_id, ci.unit_price, ci.quantity",
        )
        .bind(id)
        .bind(owner)
        .bind(quantity.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn remove_cart_item(
        &self,
        id: CartItemId,
        owner: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM shop.cart_items ci
             USING shop.carts c
             WHERE ci.id = $1 AND c.id = ci.cart_id AND c.user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = select_cart_lines(&self.pool, cart_id).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn convert_cart(
        &self,
        user_id: UserId,
        status: OrderStatus,
    ) -> Result<Conversion, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Row lock: a concurrent conversion of the same cart waits here and
        // then finds no cart.
        let cart = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at FROM shop.carts WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(cart) = cart.map(Cart::from) else {
            tx.rollback().await?;
            return Ok(Conversion::NoCart);
        };

        let lines = select_cart_lines(&mut *tx, cart.id)
            .await?
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if lines.is_empty() {
            tx.rollback().await?;
            return Ok(Conversion::EmptyCart);
        }

        let total = pricing::total(lines.iter().map(|line| (line.unit_price, line.quantity)));
        let order: Order = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO shop.orders (cart_id, user_id, total, status)
             VALUES ($1, $2, $3, $4)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(cart.id)
        .bind(user_id)
        .bind(total.amount())
        .bind(status)
        .fetch_one(&mut *tx)
        .await?
        .try_into()?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let order_line: OrderLine = sqlx::query_as::<_, OrderLineRow>(&format!(
                "INSERT INTO shop.order_lines (order_id, item_id, item_name, unit_price, quantity)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING {ORDER_LINE_COLUMNS}"
            ))
            .bind(order.id)
            .bind(line.item.id)
            .bind(line.item.name.as_str())
            .bind(line.unit_price.amount())
            .bind(line.quantity.get())
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;
            items.push(order_line);
        }

        sqlx::query("DELETE FROM shop.cart_items WHERE cart_id = $1")
            .bind(cart.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM shop.carts WHERE id = $1")
            .bind(cart.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Conversion::Placed(PlacedOrder {
            order,
            items,
            total,
        }))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, OrderLineRow>(&format!(
            "SELECT {ORDER_LINE_COLUMNS} FROM shop.order_lines WHERE order_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderDetail {
            order: row.try_into()?,
            items: lines
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<Vec<OrderLine>, RepositoryError>>()?,
        }))
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_orders_with_users(&self) -> Result<Vec<OrderWithUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderWithUserRow>(
            "SELECT o.id, o.cart_id, o.user_id, o.total, o.status, o.created_at,
                    u.username, u.admin, u.created_at AS user_created_at
             FROM shop.orders o
             JOIN shop.users u ON u.id = o.user_id
             ORDER BY o.id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE shop.orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Find or create the user's cart and lock its row.
///
/// `DO UPDATE` (rather than `DO NOTHING`) makes the statement return the
/// existing row and serializes with a concurrent conversion holding the lock.
async fn upsert_cart<'e, E>(executor: E, user_id: UserId) -> Result<CartRow, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, CartRow>(
        "INSERT INTO shop.carts (user_id) VALUES ($1)
         ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
         RETURNING id, user_id, created_at",
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
    .map_err(|e| conflict_on_violation(e, "cart already exists", "user does not exist"))
}

async fn select_cart_lines<'e, E>(
    executor: E,
    cart_id: CartId,
) -> Result<Vec<CartLineRow>, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, CartLineRow>(
        "SELECT ci.id, ci.cart_id, ci.item_id, ci.unit_price, ci.quantity,
                i.name AS item_name, i.price AS item_price
         FROM shop.cart_items ci
         JOIN shop.items i ON i.id = ci.item_id
         WHERE ci.cart_id = $1
         ORDER BY ci.id",
    )
    .bind(cart_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}
