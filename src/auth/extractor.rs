// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated requests.
//!
//! Use the `Auth` extractor in handlers behind [`BearerAuthStage`]:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is the caller's Identity
//! }
//! ```
//!
//! [`BearerAuthStage`]: super::BearerAuthStage

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::Identity;
use crate::error::ApiError;
use crate::storage::RequestScope;

/// Extractor for the authenticated caller.
///
/// Reads the [`Identity`] placed in the extensions by the bearer stage. A
/// handler mounted without that stage always rejects with `401`.
pub struct Auth(pub Identity);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Auth)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// The request's cancellation scope.
///
/// Falls back to a detached scope when no pipeline ran, so handlers can
/// always pass one to storage calls.
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestScope>()
            .cloned()
            .unwrap_or_else(RequestScope::detached))
    }
}
