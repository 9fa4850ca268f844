//! User management commands.

use shopcart_core::UserId;
use shopcart_server::services::AuthService;

use super::{CommandError, store};

/// Create a user, optionally with the admin capability.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(username: &str, password: &str, admin: bool) -> Result<UserId, CommandError> {
    let store = store().await?;

    let user = AuthService::new(&store)
        .register_with_role(username, password, admin)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Admin: {}",
        user.id,
        user.username,
        user.admin
    );
    Ok(user.id)
}
