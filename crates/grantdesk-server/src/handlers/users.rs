//! Account and department management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use grantdesk_core::auth::{MIN_PASSWORD_LENGTH, hash_password};
use grantdesk_core::{AppError, NewUser, Role};

use crate::auth::{CurrentUser, SuperAdminUser};
use crate::dto::{
    CreateUserBody, DepartmentBody, DepartmentResponse, SetActiveBody, UpdateUserBody,
    UserResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::Validation(format!("invalid email '{}'", email))),
    }
}

/// List all accounts.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Accounts", body = Vec<UserResponse>),
        (status = 403, description = "Superadmin role required"),
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _superadmin: SuperAdminUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Create an account.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserBody,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid account data"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    SuperAdminUser(admin): SuperAdminUser,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_email(&body.email)?;
    validate_password(&body.password)?;
    if body.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest("full_name cannot be empty".to_string()));
    }
    let role: Role = body.role.parse()?;

    let user = state
        .users
        .create(&NewUser {
            email: body.email,
            password_hash: hash_password(&body.password)?,
            full_name: body.full_name,
            role,
            department_id: body.department_id,
        })
        .await?;

    tracing::info!(admin_id = admin.id, user_id = user.id, role = role.as_str(), "Account created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Update an account. A new password ends the user's sessions.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserBody,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 404, description = "User not found"),
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    SuperAdminUser(admin): SuperAdminUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserBody>,
) -> Result<Json<UserResponse>, ApiError> {
    let update = body.to_update()?;
    if id == admin.id && update.role.is_some_and(|r| !r.can_manage_users()) {
        return Err(ApiError::BadRequest(
            "you cannot remove your own superadmin role".to_string(),
        ));
    }

    if let Some(password) = &body.password {
        validate_password(password)?;
    }

    let mut user = state.users.update(id, &update).await?;

    if let Some(password) = &body.password {
        state.users.set_password(id, &hash_password(password)?).await?;
        let ended = state.sessions.delete_for_user(id).await?;
        tracing::info!(admin_id = admin.id, user_id = id, sessions = ended, "Password reset");
        user = state.users.require(id).await?;
    }

    Ok(Json(user.into()))
}

/// Activate or deactivate an account. Deactivation ends its sessions.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/active",
    params(("id" = i64, Path, description = "User id")),
    request_body = SetActiveBody,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Cannot deactivate yourself"),
        (status = 404, description = "User not found"),
    ),
    tag = "users"
)]
pub async fn set_user_active(
    State(state): State<AppState>,
    SuperAdminUser(admin): SuperAdminUser,
    Path(id): Path<i64>,
    Json(body): Json<SetActiveBody>,
) -> Result<Json<UserResponse>, ApiError> {
    if id == admin.id && !body.active {
        return Err(ApiError::BadRequest(
            "you cannot deactivate your own account".to_string(),
        ));
    }

    state.users.set_active(id, body.active).await?;
    if !body.active {
        state.sessions.delete_for_user(id).await?;
    }
    tracing::info!(admin_id = admin.id, user_id = id, active = body.active, "Account status changed");

    let user = state.users.require(id).await?;
    Ok(Json(user.into()))
}

/// List departments.
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    responses(
        (status = 200, description = "Departments", body = Vec<DepartmentResponse>),
        (status = 401, description = "Not logged in"),
    ),
    tag = "users"
)]
pub async fn list_departments(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<DepartmentResponse>>, ApiError> {
    let departments = state.users.list_departments().await?;
    Ok(Json(departments.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/departments",
    request_body = DepartmentBody,
    responses(
        (status = 201, description = "Department created", body = DepartmentResponse),
        (status = 409, description = "Department already exists"),
    ),
    tag = "users"
)]
pub async fn create_department(
    State(state): State<AppState>,
    _superadmin: SuperAdminUser,
    Json(body): Json<DepartmentBody>,
) -> Result<(StatusCode, Json<DepartmentResponse>), ApiError> {
    let department = state.users.create_department(&body.name).await?;
    Ok((StatusCode::CREATED, Json(department.into())))
}
