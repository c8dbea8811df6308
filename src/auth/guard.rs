// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership-aware authorization.
//!
//! [`AuthorizationGuard::check`] applies two rules in a fixed order:
//!
//! 1. The owner of a resource may always act on it, whatever their role.
//! 2. Anyone else needs a role at or above the required role.
//!
//! The order matters: a low-role owner is never blocked by the role check,
//! and a high-role non-owner is still admitted through it.

use std::sync::Arc;

use async_trait::async_trait;

use super::middleware::log_rejection;
use super::{AuthError, Identity, RoleHierarchyResolver};
use crate::error::ApiError;
use crate::pipeline::{RequestContext, Stage};
use crate::storage::{RequestScope, StorageError};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// The owner's user ID.
    fn owner_id(&self) -> i64;
}

/// Owner of the resource targeted by the current request.
///
/// Placed in the request extensions by the stage that loads the resource,
/// read by [`AuthorizationStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceOwner(pub i64);

impl OwnedResource for ResourceOwner {
    fn owner_id(&self) -> i64 {
        self.0
    }
}

/// Why a request was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Owner,
    Role,
}

pub struct AuthorizationGuard {
    resolver: RoleHierarchyResolver,
}

impl AuthorizationGuard {
    pub fn new(resolver: RoleHierarchyResolver) -> Self {
        Self { resolver }
    }

    pub async fn check<R>(
        &self,
        identity: &Identity,
        resource: &R,
        required_role: &str,
        scope: &RequestScope,
    ) -> Result<Admission, AuthError>
    where
        R: OwnedResource + ?Sized,
    {
        if resource.owner_id() == identity.id {
            return Ok(Admission::Owner);
        }

        match self
            .resolver
            .covers(&identity.role, required_role, scope)
            .await
        {
            Ok(true) => Ok(Admission::Role),
            Ok(false) => Err(AuthError::Forbidden),
            Err(StorageError::Cancelled) => Err(AuthError::Cancelled),
            Err(e) => Err(AuthError::Internal(format!(
                "cannot resolve role {required_role:?}: {e}"
            ))),
        }
    }
}

/// Admits the request if the caller owns the target resource or holds
/// `required_role`.
///
/// Expects [`Identity`] and [`ResourceOwner`] in the request extensions.
pub struct AuthorizationStage {
    guard: Arc<AuthorizationGuard>,
    required_role: String,
}

impl AuthorizationStage {
    pub fn new(guard: Arc<AuthorizationGuard>, required_role: impl Into<String>) -> Self {
        Self {
            guard,
            required_role: required_role.into(),
        }
    }
}

#[async_trait]
impl Stage for AuthorizationStage {
    fn name(&self) -> &'static str {
        "authorization"
    }

    async fn process(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
        let Some(identity) = ctx.parts.extensions.get::<Identity>().cloned() else {
            log_rejection(self.name(), ctx, &AuthError::MissingCredentials);
            return Err(ApiError::unauthorized());
        };
        let Some(owner) = ctx.parts.extensions.get::<ResourceOwner>().copied() else {
            let err = AuthError::Internal("no resource loaded before authorization".to_string());
            log_rejection(self.name(), ctx, &err);
            return Err(err.into());
        };

        match self
            .guard
            .check(&identity, &owner, &self.required_role, &ctx.scope)
            .await
        {
            Ok(admission) => {
                tracing::debug!(
                    user_id = identity.id,
                    required_role = %self.required_role,
                    ?admission,
                    "request authorized"
                );
                Ok(())
            }
            Err(err) => {
                log_rejection(self.name(), ctx, &err);
                Err(err.into())
            }
        }
    }
}
