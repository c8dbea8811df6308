// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Backing Store Capabilities
//!
//! The authentication and authorization layer never talks to a concrete
//! database. It depends on the narrow capability traits defined here:
//!
//! | Capability | Operations |
//! |------------|------------|
//! | [`UserLoader`] | load user by id, load user by email |
//! | [`RoleLoader`] | load role by name |
//! | [`PostLoader`] | load / update / delete a post (ownership lookups) |
//! | [`CacheStore`] | get / set / delete an [`Identity`] snapshot |
//!
//! ## Cancellation
//!
//! Every suspending call made on behalf of a request goes through
//! [`RequestScope::run`], which races the call against the request's
//! cancellation token and a per-query timeout. A cancelled call yields
//! [`StorageError::Cancelled`]; nothing in this crate retries it.

pub mod cache;
pub mod memory;
pub mod user_cache;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::auth::{Identity, Role};
use crate::models::{Post, User};

pub use cache::{CacheStats, LruCacheStore};
pub use memory::InMemoryStore;
pub use user_cache::UserCache;

/// Default upper bound for a single backing-store or cache call.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for backing-store and cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("resource not found")]
    NotFound,
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Loads user records (credentials included) from the backing store.
#[async_trait]
pub trait UserLoader: Send + Sync {
    async fn load_user_by_id(&self, id: i64) -> StorageResult<User>;

    async fn load_user_by_email(&self, email: &str) -> StorageResult<User>;
}

/// Resolves role names to their level in the hierarchy.
#[async_trait]
pub trait RoleLoader: Send + Sync {
    async fn load_role_by_name(&self, name: &str) -> StorageResult<Role>;
}

/// Post access needed by the ownership checks and the post endpoints.
#[async_trait]
pub trait PostLoader: Send + Sync {
    async fn load_post(&self, id: i64) -> StorageResult<Post>;

    async fn update_post(&self, post: &Post) -> StorageResult<()>;

    async fn delete_post(&self, id: i64) -> StorageResult<()>;
}

/// Key/value store for identity snapshots keyed by user id.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns `Ok(None)` on a miss.
    async fn get(&self, user_id: i64) -> StorageResult<Option<Identity>>;

    async fn set(&self, identity: &Identity) -> StorageResult<()>;

    async fn delete(&self, user_id: i64) -> StorageResult<()>;
}

/// Per-request cancellation scope for suspending calls.
#[derive(Debug, Clone)]
pub struct RequestScope {
    cancel: CancellationToken,
    query_timeout: Duration,
}

impl RequestScope {
    pub fn new(cancel: CancellationToken, query_timeout: Duration) -> Self {
        Self {
            cancel,
            query_timeout,
        }
    }

    /// A scope that is only cancelled explicitly. Used outside of HTTP
    /// requests (startup seeding, tests).
    pub fn detached() -> Self {
        Self::new(CancellationToken::new(), DEFAULT_QUERY_TIMEOUT)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a storage call, aborting on cancellation or timeout.
    ///
    /// Cancellation wins over a result that becomes ready at the same time.
    pub async fn run<T, F>(&self, call: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StorageError::Cancelled),
            result = tokio::time::timeout(self.query_timeout, call) => {
                result.unwrap_or(Err(StorageError::Timeout(self.query_timeout)))
            }
        }
    }
}
