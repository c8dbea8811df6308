// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance.

use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info, warn};

use crate::auth::{password, AuthError};
use crate::error::ApiError;
use crate::models::LoginRequest;
use crate::state::AppState;
use crate::storage::{RequestScope, StorageError};

/// Exchange email and password for a bearer token.
///
/// An unknown email and a wrong password get the same `401`.
#[utoipa::path(
    post,
    path = "/v1/authentication/token",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Signed bearer token", body = String),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Rate limit exceeded"),
    )
)]
pub async fn create_token(
    State(state): State<AppState>,
    scope: RequestScope,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, Json<String>), ApiError> {
    let users = state.backend.users.clone();
    let user = match scope
        .run(users.load_user_by_email(&request.email))
        .await
    {
        Ok(user) => user,
        Err(StorageError::NotFound) => {
            warn!(kind = AuthError::InvalidCredentials.kind(), "login for unknown email");
            return Err(ApiError::unauthorized());
        }
        Err(StorageError::Cancelled) => return Err(AuthError::Cancelled.into()),
        Err(e) => return Err(internal(format!("user lookup failed: {e}"))),
    };

    // Argon2 verification is CPU bound.
    let password = request.password;
    let password_hash = user.password_hash.clone();
    let verified =
        tokio::task::spawn_blocking(move || password::verify_password(&password, &password_hash))
            .await
            .map_err(|e| internal(format!("password check failed: {e}")))?;

    if !verified {
        warn!(
            user_id = user.id,
            kind = AuthError::InvalidCredentials.kind(),
            "login with wrong password"
        );
        return Err(ApiError::unauthorized());
    }

    let token = state
        .tokens
        .issue(user.id)
        .map_err(|e| internal(e.to_string()))?;
    info!(user_id = user.id, "token issued");
    Ok((StatusCode::CREATED, Json(token)))
}

fn internal(detail: String) -> ApiError {
    error!(error = %detail, "login failed");
    ApiError::internal()
}
