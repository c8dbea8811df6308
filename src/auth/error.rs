// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Variants are specific so they can be logged server-side.
//! Clients only ever see the coarse class: [`AuthError`] converts into
//! [`ApiError`] by [`AuthError::class`], so "expired" and "bad signature" are
//! indistinguishable on the wire.

use thiserror::Error;

use crate::error::ApiError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header is missing")]
    MissingCredentials,
    #[error("authorization header is malformed")]
    MalformedCredentials,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    ExpiredToken,
    #[error("token issuer does not match")]
    IssuerMismatch,
    #[error("token audience does not match")]
    AudienceMismatch,
    #[error("credentials do not match")]
    InvalidCredentials,
    #[error("user lookup failed: {0}")]
    UserLookup(StorageError),
    #[error("insufficient privileges")]
    Forbidden,
    #[error("request cancelled")]
    Cancelled,
    #[error("internal authentication error: {0}")]
    Internal(String),
}

/// Client-visible class of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Unauthenticated,
    Forbidden,
    Cancelled,
    Internal,
}

impl AuthError {
    /// Stable identifier for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::MalformedCredentials => "malformed_credentials",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ExpiredToken => "expired_token",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UserLookup(_) => "user_lookup",
            AuthError::Forbidden => "forbidden",
            AuthError::Cancelled => "cancelled",
            AuthError::Internal(_) => "internal",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::MissingCredentials
            | AuthError::MalformedCredentials
            | AuthError::InvalidSignature
            | AuthError::ExpiredToken
            | AuthError::IssuerMismatch
            | AuthError::AudienceMismatch
            | AuthError::InvalidCredentials
            | AuthError::UserLookup(_) => ErrorClass::Unauthenticated,
            AuthError::Forbidden => ErrorClass::Forbidden,
            AuthError::Cancelled => ErrorClass::Cancelled,
            AuthError::Internal(_) => ErrorClass::Internal,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err.class() {
            ErrorClass::Unauthenticated => ApiError::unauthorized(),
            ErrorClass::Forbidden => ApiError::forbidden(),
            ErrorClass::Cancelled => ApiError::cancelled(),
            ErrorClass::Internal => ApiError::internal(),
        }
    }
}
