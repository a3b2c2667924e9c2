//! Admin role handlers.
//!
//! These endpoints trust the caller-supplied user id; authentication is the
//! identity provider's job.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use cushion_core::{Email, UserId, UserRole};

use super::{json_body, non_empty};
use crate::{
    db::{AdminEntry, AdminRoleRepository},
    error::AppError,
    state::AppState,
};

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/check/{user_id}", get(check_admin))
        .route("/admin/role/{user_id}", get(get_role))
        .route("/admin/set-role", post(set_role))
        .route("/admin/remove-role", post(remove_role))
        .route("/admin/list", get(list_admins))
        .route("/admin/initialize", post(initialize_admin))
        .route("/admin/claim", post(claim_admin))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleRequest {
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRoleRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub is_admin: bool,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeResponse {
    pub success: bool,
    pub user_id: UserId,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub admins: Vec<AdminEntry>,
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub success: bool,
    pub message: &'static str,
    pub email: Email,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub promoted: bool,
    pub role: UserRole,
}

fn parse_email(raw: &str) -> Result<Email, AppError> {
    Email::parse(raw).map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))
}

/// Whether a user is an admin.
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
#[tracing::instrument(skip(state))]
pub async fn check_admin(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CheckResponse>, AppError> {
    let role = AdminRoleRepository::new(state.kv())
        .role(&UserId::new(user_id))
        .await?;
    Ok(Json(CheckResponse {
        is_admin: role.is_admin(),
        role,
    }))
}

/// A user's role.
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
#[tracing::instrument(skip(state))]
pub async fn get_role(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = AdminRoleRepository::new(state.kv())
        .role(&UserId::new(user_id))
        .await?;
    Ok(Json(RoleResponse { role }))
}

/// Assign a role.
///
/// # Errors
///
/// Returns 400 if `userId` or `role` is missing, the role is unknown or the
/// email is malformed.
#[tracing::instrument(skip(state, body))]
pub async fn set_role(
    State(state): State<AppState>,
    body: Result<Json<SetRoleRequest>, JsonRejection>,
) -> Result<Json<RoleChangeResponse>, AppError> {
    let request = json_body(body)?;
    let (Some(user_id), Some(raw_role)) = (non_empty(request.user_id), non_empty(request.role))
    else {
        return Err(AppError::BadRequest("userId and role are required".to_string()));
    };
    let role: UserRole = raw_role
        .parse()
        .map_err(|e: cushion_core::UserRoleError| AppError::BadRequest(e.to_string()))?;
    let email = non_empty(request.email)
        .as_deref()
        .map(parse_email)
        .transpose()?;

    let user_id = UserId::new(user_id);
    AdminRoleRepository::new(state.kv())
        .set_role(&user_id, role, email.as_ref())
        .await?;

    Ok(Json(RoleChangeResponse {
        success: true,
        user_id,
        role,
    }))
}

/// Demote a user to customer.
///
/// # Errors
///
/// Returns 400 if `userId` is missing.
#[tracing::instrument(skip(state, body))]
pub async fn remove_role(
    State(state): State<AppState>,
    body: Result<Json<RemoveRoleRequest>, JsonRejection>,
) -> Result<Json<RoleChangeResponse>, AppError> {
    let Some(user_id) = non_empty(json_body(body)?.user_id) else {
        return Err(AppError::BadRequest("userId is required".to_string()));
    };

    let user_id = UserId::new(user_id);
    AdminRoleRepository::new(state.kv())
        .remove_role(&user_id)
        .await?;

    Ok(Json(RoleChangeResponse {
        success: true,
        user_id,
        role: UserRole::Customer,
    }))
}

/// Every admin with their current role.
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
#[tracing::instrument(skip(state))]
pub async fn list_admins(
    State(state): State<AppState>,
) -> Result<Json<AdminListResponse>, AppError> {
    let admins = AdminRoleRepository::new(state.kv()).list_admins().await?;
    Ok(Json(AdminListResponse { admins }))
}

/// Register the email of the first admin.
///
/// # Errors
///
/// Returns 400 if the email is missing or malformed, or if an admin already
/// exists (with `existingAdmins`).
#[tracing::instrument(skip(state, body))]
pub async fn initialize_admin(
    State(state): State<AppState>,
    body: Result<Json<InitializeRequest>, JsonRejection>,
) -> Result<Json<InitializeResponse>, AppError> {
    let Some(raw_email) = non_empty(json_body(body)?.email) else {
        return Err(AppError::BadRequest("email is required".to_string()));
    };
    let email = parse_email(&raw_email)?;

    AdminRoleRepository::new(state.kv())
        .bootstrap_first_admin(&email)
        .await?;

    Ok(Json(InitializeResponse {
        success: true,
        message: "Admin email registered. User will be promoted to admin on first login.",
        email,
    }))
}

/// Promote the signed-in user if their email was registered as first admin.
///
/// # Errors
///
/// Returns 400 if `userId` or `email` is missing or the email is malformed.
#[tracing::instrument(skip(state, body))]
pub async fn claim_admin(
    State(state): State<AppState>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, AppError> {
    let request = json_body(body)?;
    let (Some(user_id), Some(raw_email)) = (non_empty(request.user_id), non_empty(request.email))
    else {
        return Err(AppError::BadRequest("userId and email are required".to_string()));
    };
    let email = parse_email(&raw_email)?;
    let user_id = UserId::new(user_id);

    let roles = AdminRoleRepository::new(state.kv());
    let promoted = roles.claim_pending_admin(&user_id, &email).await?;
    let role = roles.role(&user_id).await?;

    Ok(Json(ClaimResponse { promoted, role }))
}
