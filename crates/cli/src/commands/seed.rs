//! Sample data for local development.
//!
//! Creates an admin and a regular user, the sample catalog, and a cart for
//! the regular user. Does nothing if any user already exists.

use rust_decimal::Decimal;

use shopcart_core::Actor;
use shopcart_server::db::Store;
use shopcart_server::services::{AuthService, CartService, CatalogService};

use super::{CommandError, store};

/// Sample catalog as `(name, price in cents, quantity in the user's cart)`.
const SAMPLE_ITEMS: [(&str, i64, i32); 8] = [
    ("Laptop", 99_999, 1),
    ("Phone", 49_999, 2),
    ("Headphones", 19_999, 0),
    ("Smartwatch", 29_999, 0),
    ("Tablet", 39_999, 0),
    ("Camera", 59_999, 0),
    ("Speaker", 14_999, 0),
    ("Monitor", 24_999, 0),
];

/// Seed the configured database.
pub async fn run() -> Result<(), CommandError> {
    let store = store().await?;
    seed(&store).await
}

/// Seed `store` unless it already has users.
///
/// # Errors
///
/// Returns `CommandError::Service` if any insert is rejected.
pub async fn seed(store: &dyn Store) -> Result<(), CommandError> {
    if store.count_users().await? > 0 {
        tracing::info!("Users already exist, skipping seed");
        return Ok(());
    }

    let auth = AuthService::new(store);
    let admin = auth.register_with_role("admin", "admin123", true).await?;
    let user = auth.register_with_role("user", "user123", false).await?;
    tracing::info!("Created users 'admin' and 'user'");

    let catalog = CatalogService::new(store);
    let cart = CartService::new(store);
    let actor = Actor::admin(admin.id);
    for (name, cents, in_cart) in SAMPLE_ITEMS {
        let item = catalog
            .create_item(&actor, name, Decimal::new(cents, 2))
            .await?;
        if in_cart > 0 {
            cart.add_item(user.id, item.id, in_cart).await?;
        }
    }
    tracing::info!(count = SAMPLE_ITEMS.len(), "Created sample items and filled cart for 'user'");

    tracing::info!("Seed complete!");
    Ok(())
}
