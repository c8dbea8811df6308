// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication stages.
//!
//! - [`BearerAuthStage`] validates `Authorization: Bearer <token>` and
//!   attaches the caller's [`Identity`] to the request extensions.
//! - [`BasicAuthStage`] guards operational routes with the static credential
//!   pair and answers failures with a `Basic` challenge.
//!
//! A validly signed token for a user that no longer exists is rejected
//! exactly like a bad credential, so token holders cannot probe for
//! existing accounts.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderValue};
use tracing::{error, warn};

use super::{AuthError, ErrorClass, Identity, StaticCredentialGate, TokenAuthenticator};
use crate::error::ApiError;
use crate::pipeline::{RequestContext, Stage};
use crate::storage::{RequestScope, StorageError, UserCache};

/// Resolves a bearer header to an [`Identity`].
pub struct AuthenticationMiddleware {
    tokens: Arc<TokenAuthenticator>,
    users: Arc<UserCache>,
}

impl AuthenticationMiddleware {
    pub fn new(tokens: Arc<TokenAuthenticator>, users: Arc<UserCache>) -> Self {
        Self { tokens, users }
    }

    pub async fn authenticate(
        &self,
        header: Option<&HeaderValue>,
        scope: &RequestScope,
    ) -> Result<Identity, AuthError> {
        let header = header
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::MalformedCredentials)?;

        let token = bearer_token(header)?;
        // The claims type only admits a numeric subject, so a validated token
        // always carries a user id.
        let claims = self.tokens.validate_token(token)?;

        self.users
            .get_or_load(claims.subject, scope)
            .await
            .map_err(|e| match e {
                StorageError::Cancelled => AuthError::Cancelled,
                other => AuthError::UserLookup(other),
            })
    }
}

/// Split `Bearer <token>` into exactly two space-separated parts.
fn bearer_token(header: &str) -> Result<&str, AuthError> {
    match header.split(' ').collect::<Vec<_>>().as_slice() {
        ["Bearer", token] => Ok(*token),
        _ => Err(AuthError::MalformedCredentials),
    }
}

/// Log an auth failure with its specific kind before it is collapsed.
pub(crate) fn log_rejection(stage: &'static str, ctx: &RequestContext<'_>, err: &AuthError) {
    let path = ctx.parts.uri.path();
    let method = ctx.parts.method.as_str();
    match err.class() {
        ErrorClass::Internal => {
            error!(stage, method, path, error = %err, kind = err.kind(), "request rejected")
        }
        _ => warn!(stage, method, path, error = %err, kind = err.kind(), "request rejected"),
    }
}

pub struct BearerAuthStage {
    authn: Arc<AuthenticationMiddleware>,
}

impl BearerAuthStage {
    pub fn new(authn: Arc<AuthenticationMiddleware>) -> Self {
        Self { authn }
    }
}

#[async_trait]
impl Stage for BearerAuthStage {
    fn name(&self) -> &'static str {
        "bearer_auth"
    }

    async fn process(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
        let header = ctx.parts.headers.get(AUTHORIZATION).cloned();
        match self.authn.authenticate(header.as_ref(), &ctx.scope).await {
            Ok(identity) => {
                ctx.parts.extensions.insert(identity);
                Ok(())
            }
            Err(err) => {
                log_rejection(self.name(), ctx, &err);
                Err(err.into())
            }
        }
    }
}

pub struct BasicAuthStage {
    gate: Arc<StaticCredentialGate>,
}

impl BasicAuthStage {
    pub fn new(gate: Arc<StaticCredentialGate>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl Stage for BasicAuthStage {
    fn name(&self) -> &'static str {
        "basic_auth"
    }

    async fn process(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
        self.gate
            .verify(ctx.parts.headers.get(AUTHORIZATION))
            .map_err(|err| {
                log_rejection(self.name(), ctx, &err);
                ApiError::unauthorized_basic()
            })
    }
}
