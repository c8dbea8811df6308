// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post endpoints.
//!
//! The target post is loaded by [`PostContextStage`] before the handler
//! runs, so the authorization stage can compare its owner with the caller.
//! Handlers read the loaded post from the request extensions.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{error, info};

use crate::auth::{Auth, ResourceOwner};
use crate::error::ApiError;
use crate::models::{Post, UpdatePostRequest};
use crate::pipeline::{RequestContext, Stage};
use crate::state::AppState;
use crate::storage::{PostLoader, RequestScope, StorageError};

/// Loads the post named by the `{post_id}` path parameter.
///
/// Inserts the [`Post`] and its [`ResourceOwner`] into the extensions.
pub struct PostContextStage {
    posts: Arc<dyn PostLoader>,
}

impl PostContextStage {
    pub fn new(posts: Arc<dyn PostLoader>) -> Self {
        Self { posts }
    }
}

#[async_trait]
impl Stage for PostContextStage {
    fn name(&self) -> &'static str {
        "post_context"
    }

    async fn process(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
        let Path(post_id) = Path::<i64>::from_request_parts(&mut *ctx.parts, &())
            .await
            .map_err(|_| ApiError::bad_request("invalid post id"))?;

        let post = ctx
            .scope
            .run(self.posts.load_post(post_id))
            .await
            .map_err(|e| storage_error(post_id, e))?;

        ctx.parts.extensions.insert(ResourceOwner(post.user_id));
        ctx.parts.extensions.insert(post);
        Ok(())
    }
}

fn storage_error(post_id: i64, err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound => ApiError::not_found("post not found"),
        StorageError::Cancelled => ApiError::cancelled(),
        other => {
            error!(post_id, error = %other, "post storage failure");
            ApiError::internal()
        }
    }
}

/// Get a post.
#[utoipa::path(
    get,
    path = "/v1/posts/{post_id}",
    tag = "Posts",
    security(("bearer" = [])),
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "The post", body = Post),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn get_post(Extension(post): Extension<Post>) -> Json<Post> {
    Json(post)
}

/// Update a post. Allowed for its owner and for moderators and above.
#[utoipa::path(
    patch,
    path = "/v1/posts/{post_id}",
    tag = "Posts",
    security(("bearer" = [])),
    params(("post_id" = i64, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated post", body = Post),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Neither owner nor moderator"),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    Auth(identity): Auth,
    scope: RequestScope,
    Extension(mut post): Extension<Post>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    request.apply(&mut post);
    scope
        .run(state.backend.posts.update_post(&post))
        .await
        .map_err(|e| storage_error(post.id, e))?;

    info!(post_id = post.id, user_id = identity.id, "post updated");
    Ok(Json(post))
}

/// Delete a post. Allowed for its owner and for admins.
#[utoipa::path(
    delete,
    path = "/v1/posts/{post_id}",
    tag = "Posts",
    security(("bearer" = [])),
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Auth(identity): Auth,
    scope: RequestScope,
    Extension(post): Extension<Post>,
) -> Result<StatusCode, ApiError> {
    scope
        .run(state.backend.posts.delete_post(post.id))
        .await
        .map_err(|e| storage_error(post.id, e))?;

    info!(post_id = post.id, user_id = identity.id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_statuses() {
        assert_eq!(storage_error(1, StorageError::NotFound).status, StatusCode::NOT_FOUND);
        assert_eq!(
            storage_error(1, StorageError::Cancelled).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            storage_error(1, StorageError::Backend("down".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
