//! Admin role commands.
//!
//! # Usage
//!
//! ```bash
//! # Register the first admin; they are promoted on first login
//! cushion admin init -e owner@example.nl
//!
//! # Grant or revoke admin for a known user
//! cushion admin grant -u user-123 -e anna@example.nl
//! cushion admin revoke -u user-123
//!
//! # List admins
//! cushion admin list
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string

use cushion_core::{Email, UserId, UserRole};
use cushion_server::db::AdminRoleRepository;

use super::{CliError, connect_store, print_json};

/// Register the first admin's email.
///
/// # Errors
///
/// Returns error if the email is invalid or an admin already exists.
pub async fn init(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let store = connect_store().await?;

    AdminRoleRepository::new(&store)
        .bootstrap_first_admin(&email)
        .await?;

    tracing::info!(
        "Admin email registered: {}. User will be promoted to admin on first login.",
        email
    );
    Ok(())
}

/// Make `user_id` an admin.
///
/// # Errors
///
/// Returns error if the email is invalid or the store cannot be written.
pub async fn grant(user_id: &str, email: Option<&str>) -> Result<(), CliError> {
    let email = email.map(Email::parse).transpose()?;
    let store = connect_store().await?;
    let user_id = UserId::new(user_id);

    AdminRoleRepository::new(&store)
        .set_role(&user_id, UserRole::Admin, email.as_ref())
        .await?;

    tracing::info!("Granted admin to {}", user_id);
    Ok(())
}

/// Demote `user_id` to customer.
///
/// # Errors
///
/// Returns error if the store cannot be written.
pub async fn revoke(user_id: &str) -> Result<(), CliError> {
    let store = connect_store().await?;
    let user_id = UserId::new(user_id);

    AdminRoleRepository::new(&store).remove_role(&user_id).await?;

    tracing::info!("Revoked admin from {}", user_id);
    Ok(())
}

/// Print every admin as JSON.
///
/// # Errors
///
/// Returns error if the store cannot be read.
pub async fn list() -> Result<(), CliError> {
    let store = connect_store().await?;
    let admins = AdminRoleRepository::new(&store).list_admins().await?;
    print_json(&admins)
}
