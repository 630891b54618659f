use crate::auth::jwt::sign_token;
use crate::auth::password::{check_password, hash_password};
use crate::dtos::user::{ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, UserResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::user::User;
use crate::state::AppState;
use axum::extract::Extension;
use axum::{extract::State, Json};
use tracing::{info, instrument, warn};

const USER_COLUMNS: &str = "id, username, password_hash, is_active, created_at";

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>
) -> Result<Json<LoginResponse>, AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::validation("Username required"));
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("Password required"));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(payload.username.trim())
    .fetch_optional(&state.db_pool)
    .await?;

    // Same answer for unknown user and wrong password
    let Some(user) = user else {
        warn!("Invalid login");
        return Err(AppError::Unauthorized);
    };
    if !check_password(&payload.password, &user.password_hash)? {
        warn!("Invalid login");
        return Err(AppError::Unauthorized);
    }
    if !user.is_active {
        return Err(AppError::forbidden("User inactive"));
    }

    let ttl_hours = state.config.token_ttl_hours;
    let token = sign_token(user.id, &user.username, &state.config.jwt_secret, ttl_hours)?;

    info!(user_id = user.id, "User signed in");
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in_seconds: ttl_hours.saturating_mul(60 * 60),
    }))
}

// Authenticated endpoint: returns the signed-in user's profile
#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>
) -> Result<Json<UserResponse>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse {
        id: user.id,
        username: user.username,
        is_active: user.is_active,
        created_at: user.created_at,
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.new_password.is_empty() {
        return Err(AppError::validation("Password change failed! New password required"));
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    if !check_password(&payload.old_password, &user.password_hash)? {
        return Err(AppError::validation("Password change failed! Old password is incorrect"));
    }

    let password_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(user.id)
        .execute(&state.db_pool)
        .await?;

    info!(user_id = user.id, "Password changed");
    Ok(Json(MessageResponse {
        message: "Password change complete!".to_string(),
    }))
}
