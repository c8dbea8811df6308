// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication and Authorization
//!
//! ## Auth Flow
//!
//! 1. A client logs in with email and password and receives a signed token
//!    (HS256) whose `sub` is its numeric user id.
//! 2. The client sends `Authorization: Bearer <token>` on every call.
//! 3. The gateway:
//!    - Verifies signature, expiry, issuer and audience (no clock leeway)
//!    - Resolves `sub` to an [`Identity`] through the [`UserCache`]
//!    - Attaches the identity to the request for later stages and handlers
//! 4. Resource routes run an [`AuthorizationStage`]: the owner of the
//!    resource is always admitted, everyone else needs a high enough role.
//!
//! Operational routes use [`StaticCredentialGate`] (HTTP Basic) instead.
//!
//! ## Failures
//!
//! Every authentication failure reaches the client as the same `401` body.
//! The specific [`AuthError`] kind is only logged.
//!
//! [`UserCache`]: crate::storage::UserCache

pub mod basic;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod token;

pub use basic::StaticCredentialGate;
pub use claims::{Identity, TokenClaims};
pub use error::{AuthError, ErrorClass};
pub use extractor::Auth;
pub use guard::{Admission, AuthorizationGuard, AuthorizationStage, OwnedResource, ResourceOwner};
pub use middleware::{AuthenticationMiddleware, BasicAuthStage, BearerAuthStage};
pub use roles::{Role, RoleHierarchyResolver, ROLE_ADMIN, ROLE_MODERATOR, ROLE_USER};
pub use token::TokenAuthenticator;
