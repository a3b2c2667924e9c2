//! Admin role calls on the catalog client. Nothing here is cached.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use cushion_core::{Email, UserId, UserRole};

use crate::client::CatalogClient;
use crate::error::ApiError;

/// Result of `GET /admin/check/{userId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCheck {
    pub is_admin: bool,
    pub role: UserRole,
}

/// Result of a role change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChange {
    pub success: bool,
    pub user_id: UserId,
    pub role: UserRole,
}

/// An admin as listed by `GET /admin/list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminUser {
    pub id: UserId,
    pub role: UserRole,
}

/// Result of registering the first admin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminBootstrap {
    pub success: bool,
    pub message: String,
    pub email: Email,
}

/// Result of claiming a pending admin registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AdminClaim {
    pub promoted: bool,
    pub role: UserRole,
}

#[derive(Deserialize)]
struct RoleEnvelope {
    role: UserRole,
}

#[derive(Deserialize)]
struct AdminsEnvelope {
    admins: Vec<AdminUser>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetRoleBody<'a> {
    user_id: &'a UserId,
    role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a Email>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserBody<'a> {
    user_id: &'a UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a Email>,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a Email,
}

impl CatalogClient {
    /// Whether `user_id` is an admin.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn check_admin(&self, user_id: &UserId) -> Result<AdminCheck, ApiError> {
        self.get_json(&format!(
            "/admin/check/{}",
            urlencoding::encode(user_id.as_str())
        ))
        .await
    }

    /// The role of `user_id`; unknown users are customers.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn user_role(&self, user_id: &UserId) -> Result<UserRole, ApiError> {
        let envelope: RoleEnvelope = self
            .get_json(&format!(
                "/admin/role/{}",
                urlencoding::encode(user_id.as_str())
            ))
            .await?;
        Ok(envelope.role)
    }

    /// Assign `role` to `user_id`, optionally recording their email.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 400 on invalid input.
    #[instrument(skip(self))]
    pub async fn set_role(
        &self,
        user_id: &UserId,
        role: UserRole,
        email: Option<&Email>,
    ) -> Result<RoleChange, ApiError> {
        let body = SetRoleBody {
            user_id,
            role,
            email,
        };
        self.post_json("/admin/set-role", Some(&body)).await
    }

    /// Demote `user_id` to customer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 400 on invalid input.
    #[instrument(skip(self))]
    pub async fn remove_role(&self, user_id: &UserId) -> Result<RoleChange, ApiError> {
        let body = UserBody {
            user_id,
            email: None,
        };
        self.post_json("/admin/remove-role", Some(&body)).await
    }

    /// Every admin.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server rejects it.
    #[instrument(skip(self))]
    pub async fn list_admins(&self) -> Result<Vec<AdminUser>, ApiError> {
        let envelope: AdminsEnvelope = self.get_json("/admin/list").await?;
        Ok(envelope.admins)
    }

    /// Register the email of the first admin.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 400 once any admin exists.
    #[instrument(skip(self))]
    pub async fn initialize_admin(&self, email: &Email) -> Result<AdminBootstrap, ApiError> {
        self.post_json("/admin/initialize", Some(&EmailBody { email }))
            .await
    }

    /// Promote `user_id` if `email` is the registered first-admin email.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 400 on invalid input.
    #[instrument(skip(self))]
    pub async fn claim_admin(&self, user_id: &UserId, email: &Email) -> Result<AdminClaim, ApiError> {
        let body = UserBody {
            user_id,
            email: Some(email),
        };
        self.post_json("/admin/claim", Some(&body)).await
    }
}
