//! Admin role repository.
//!
//! Roles are per user id. The set of admin ids is kept as a separate array so
//! admins can be listed without scanning every user, and the first admin is
//! bootstrapped by email: an operator registers the email, and the user who
//! next signs in with it is promoted.

use serde::Serialize;
use thiserror::Error;

use cushion_core::{Email, UserId, UserRole};

use super::{RepositoryError, decode, encode};
use crate::kv::KvStore;

const ADMIN_USERS_KEY: &str = "admin:users";
const SETUP_EMAIL_KEY: &str = "admin:setup:email";

fn role_key(user: &UserId) -> String {
    format!("user:{user}:role")
}

fn email_key(email: &Email) -> String {
    format!("admin:email:{email}")
}

/// Errors specific to admin role management.
#[derive(Debug, Error)]
pub enum AdminRoleError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// First-admin bootstrap attempted after an admin already exists.
    #[error("Admins already exist. Use set-role endpoint instead.")]
    AdminsExist { existing_admins: usize },
}

/// An entry in the admin list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminEntry {
    pub id: UserId,
    pub role: UserRole,
}

/// Repository for user roles.
pub struct AdminRoleRepository<'a> {
    kv: &'a dyn KvStore,
}

impl<'a> AdminRoleRepository<'a> {
    /// Create a new admin role repository.
    #[must_use]
    pub const fn new(kv: &'a dyn KvStore) -> Self {
        Self { kv }
    }

    /// The user's role; users without a stored role are customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored role is not a
    /// known role string.
    pub async fn role(&self, user: &UserId) -> Result<UserRole, RepositoryError> {
        let key = role_key(user);
        let Some(value) = self.kv.get(&key).await? else {
            return Ok(UserRole::default());
        };
        let raw: String = decode(&key, value)?;
        raw.parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("{key}: {e}")))
    }

    /// Whether the user is an admin.
    ///
    /// # Errors
    ///
    /// See [`Self::role`].
    pub async fn is_admin(&self, user: &UserId) -> Result<bool, RepositoryError> {
        Ok(self.role(user).await?.is_admin())
    }

    /// Assign a role. Admins are added to the admin set and, when an email is
    /// given, recorded under that email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if a write fails. Writes are not
    /// atomic; a failure may leave the role set without the admin-set entry.
    #[tracing::instrument(skip(self, email), fields(user = %user, role = %role))]
    pub async fn set_role(
        &self,
        user: &UserId,
        role: UserRole,
        email: Option<&Email>,
    ) -> Result<(), RepositoryError> {
        self.kv.set(&role_key(user), encode(&role.as_str())?).await?;

        if role.is_admin() {
            let mut admins = self.admin_ids().await?;
            if !admins.contains(user) {
                admins.push(user.clone());
                self.kv.set(ADMIN_USERS_KEY, encode(&admins)?).await?;
            }

            if let Some(email) = email {
                self.kv.set(&email_key(email), encode(user)?).await?;
            }
        }

        tracing::info!("role assigned");
        Ok(())
    }

    /// Demote a user to customer and drop them from the admin set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if a write fails.
    #[tracing::instrument(skip(self), fields(user = %user))]
    pub async fn remove_role(&self, user: &UserId) -> Result<(), RepositoryError> {
        self.kv
            .set(&role_key(user), encode(&UserRole::Customer.as_str())?)
            .await?;

        let admins: Vec<UserId> = self
            .admin_ids()
            .await?
            .into_iter()
            .filter(|id| id != user)
            .collect();
        self.kv.set(ADMIN_USERS_KEY, encode(&admins)?).await?;

        tracing::info!("role removed");
        Ok(())
    }

    /// Every user in the admin set with their current role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` or `RepositoryError::DataCorruption`.
    pub async fn list_admins(&self) -> Result<Vec<AdminEntry>, RepositoryError> {
        let mut entries = Vec::new();
        for id in self.admin_ids().await? {
            let role = self.role(&id).await?;
            entries.push(AdminEntry { id, role });
        }
        Ok(entries)
    }

    /// Register the email of the first admin. The user is promoted by
    /// [`Self::claim_pending_admin`] on their next sign-in.
    ///
    /// No role entry is created here.
    ///
    /// # Errors
    ///
    /// Returns `AdminRoleError::AdminsExist` if any admin already exists.
    #[tracing::instrument(skip(self), fields(email = %email))]
    pub async fn bootstrap_first_admin(&self, email: &Email) -> Result<(), AdminRoleError> {
        let existing_admins = self.admin_ids().await?.len();
        if existing_admins > 0 {
            tracing::warn!(existing_admins, "first-admin bootstrap refused");
            return Err(AdminRoleError::AdminsExist { existing_admins });
        }

        self.kv
            .set(SETUP_EMAIL_KEY, encode(&email.as_str())?)
            .await
            .map_err(RepositoryError::from)?;

        tracing::info!("first admin email registered");
        Ok(())
    }

    /// The email awaiting first-admin promotion, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` or `RepositoryError::DataCorruption`.
    pub async fn pending_admin_email(&self) -> Result<Option<Email>, RepositoryError> {
        let Some(value) = self.kv.get(SETUP_EMAIL_KEY).await? else {
            return Ok(None);
        };
        decode(SETUP_EMAIL_KEY, value).map(Some)
    }

    /// Promote `user` to admin if `email` matches the pending bootstrap email
    /// (case-insensitive), then clear the pending email.
    ///
    /// Returns whether the user was promoted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if a read or write fails.
    #[tracing::instrument(skip(self, email), fields(user = %user))]
    pub async fn claim_pending_admin(
        &self,
        user: &UserId,
        email: &Email,
    ) -> Result<bool, RepositoryError> {
        let Some(pending) = self.pending_admin_email().await? else {
            return Ok(false);
        };
        if !pending.matches(email) {
            return Ok(false);
        }

        self.set_role(user, UserRole::Admin, Some(email)).await?;
        self.kv.delete(SETUP_EMAIL_KEY).await?;

        tracing::info!("pending admin promoted");
        Ok(true)
    }

    async fn admin_ids(&self) -> Result<Vec<UserId>, RepositoryError> {
        match self.kv.get(ADMIN_USERS_KEY).await? {
            Some(value) => decode(ADMIN_USERS_KEY, value),
            None => Ok(Vec::new()),
        }
    }
}
