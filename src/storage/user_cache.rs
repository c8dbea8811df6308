// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-through user cache.
//!
//! ## Consistency
//!
//! This is a cache-aside layer, not a write-through one. Writes to the
//! backing store that are not followed by [`UserCache::set`] or
//! [`UserCache::delete`] leave a stale snapshot in place until it is evicted
//! or overwritten.
//!
//! ## Concurrency
//!
//! Concurrent [`UserCache::get_or_load`] calls for the same missing id each
//! reach the backing store independently. There is no single-flight
//! coalescing, so a burst of requests for a cold user is a thundering herd
//! against the store.

use std::sync::Arc;

use tracing::debug;

use super::{CacheStore, RequestScope, StorageResult, UserLoader};
use crate::auth::Identity;

pub struct UserCache {
    users: Arc<dyn UserLoader>,
    /// `None` puts the cache in pass-through mode.
    store: Option<Arc<dyn CacheStore>>,
}

impl UserCache {
    pub fn new(users: Arc<dyn UserLoader>, store: Option<Arc<dyn CacheStore>>) -> Self {
        Self { users, store }
    }

    /// Every lookup goes straight to the backing store; nothing is cached.
    pub fn pass_through(users: Arc<dyn UserLoader>) -> Self {
        Self::new(users, None)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Return the identity for `user_id`, loading and caching it on a miss.
    pub async fn get_or_load(&self, user_id: i64, scope: &RequestScope) -> StorageResult<Identity> {
        let Some(store) = &self.store else {
            let user = scope.run(self.users.load_user_by_id(user_id)).await?;
            return Ok(user.identity());
        };

        if let Some(identity) = scope.run(store.get(user_id)).await? {
            debug!(user_id, "user cache hit");
            return Ok(identity);
        }

        debug!(user_id, "user cache miss");
        let identity = scope.run(self.users.load_user_by_id(user_id)).await?.identity();
        scope.run(store.set(&identity)).await?;
        Ok(identity)
    }

    /// Overwrite the cached snapshot. No-op in pass-through mode.
    pub async fn set(&self, identity: &Identity, scope: &RequestScope) -> StorageResult<()> {
        match &self.store {
            Some(store) => scope.run(store.set(identity)).await,
            None => Ok(()),
        }
    }

    /// Drop the cached snapshot. No-op in pass-through mode.
    pub async fn delete(&self, user_id: i64, scope: &RequestScope) -> StorageResult<()> {
        match &self.store {
            Some(store) => scope.run(store.delete(user_id)).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ROLE_ADMIN, ROLE_USER};
    use crate::storage::{InMemoryStore, LruCacheStore, StorageError};

    async fn seeded() -> (Arc<InMemoryStore>, i64) {
        let store = Arc::new(InMemoryStore::new());
        let user = store
            .insert_user("alice", "alice@example.com", "hash", ROLE_USER)
            .await
            .unwrap();
        (store, user.id)
    }

    fn cached(store: &Arc<InMemoryStore>) -> UserCache {
        UserCache::new(store.clone(), Some(Arc::new(LruCacheStore::new(16))))
    }

    #[tokio::test]
    async fn miss_loads_once_then_hits() {
        let (store, id) = seeded().await;
        let cache = cached(&store);
        let scope = RequestScope::detached();

        let first = cache.get_or_load(id, &scope).await.unwrap();
        let second = cache.get_or_load(id, &scope).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.user_loads(), 1);
    }

    #[tokio::test]
    async fn set_is_served_without_backing_store() {
        let (store, id) = seeded().await;
        let cache = cached(&store);
        let scope = RequestScope::detached();

        let mut identity = store.load_user_by_id(id).await.unwrap().identity();
        identity.username = "alice-from-cache".to_string();
        cache.set(&identity, &scope).await.unwrap();
        let loads_before = store.user_loads();

        let got = cache.get_or_load(id, &scope).await.unwrap();
        assert_eq!(got, identity);
        assert_eq!(store.user_loads(), loads_before);
    }

    #[tokio::test]
    async fn delete_forces_reload() {
        let (store, id) = seeded().await;
        let cache = cached(&store);
        let scope = RequestScope::detached();

        cache.get_or_load(id, &scope).await.unwrap();
        cache.delete(id, &scope).await.unwrap();
        cache.get_or_load(id, &scope).await.unwrap();

        assert_eq!(store.user_loads(), 2);
    }

    #[tokio::test]
    async fn backing_store_writes_leave_stale_entries() {
        let (store, id) = seeded().await;
        let cache = cached(&store);
        let scope = RequestScope::detached();

        cache.get_or_load(id, &scope).await.unwrap();
        store.set_user_role(id, ROLE_ADMIN).await.unwrap();

        let stale = cache.get_or_load(id, &scope).await.unwrap();
        assert_eq!(stale.role.name, ROLE_USER);

        cache.delete(id, &scope).await.unwrap();
        let fresh = cache.get_or_load(id, &scope).await.unwrap();
        assert_eq!(fresh.role.name, ROLE_ADMIN);
    }

    #[tokio::test]
    async fn pass_through_always_hits_backing_store() {
        let (store, id) = seeded().await;
        let cache = UserCache::pass_through(store.clone());
        let scope = RequestScope::detached();
        assert!(!cache.is_enabled());

        let identity = cache.get_or_load(id, &scope).await.unwrap();
        cache.set(&identity, &scope).await.unwrap();
        cache.get_or_load(id, &scope).await.unwrap();

        assert_eq!(store.user_loads(), 2);
    }

    #[tokio::test]
    async fn missing_user_is_not_cached() {
        let (store, _) = seeded().await;
        let cache = cached(&store);
        let scope = RequestScope::detached();

        assert_eq!(
            cache.get_or_load(999, &scope).await,
            Err(StorageError::NotFound)
        );
        assert_eq!(
            cache.get_or_load(999, &scope).await,
            Err(StorageError::NotFound)
        );
        assert_eq!(store.user_loads(), 2);
    }

    #[tokio::test]
    async fn cancelled_scope_aborts_lookup() {
        let (store, id) = seeded().await;
        let cache = cached(&store);
        let scope = RequestScope::detached();
        scope.cancel_token().cancel();

        assert_eq!(
            cache.get_or_load(id, &scope).await,
            Err(StorageError::Cancelled)
        );
    }
}
