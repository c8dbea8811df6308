// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Social Gateway - Request Authentication and Authorization
//!
//! This crate provides the request-admission core of a small social API:
//! per-client rate limiting, bearer token and static basic-auth
//! authentication, an identity cache, and owner-or-role authorization.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Tokens, credential gates, role hierarchy, authorization guard
//! - `pipeline` - Ordered request stages run as one middleware
//! - `rate_limit` - Fixed-window per-client rate limiter
//! - `storage` - Backing-store capabilities, identity cache

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod rate_limit;
pub mod state;
pub mod storage;
