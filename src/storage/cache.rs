// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process LRU store for identity snapshots.
//!
//! The table is split into lock-striped shards (user id modulo shard count)
//! so concurrent requests for different users rarely contend on the same
//! mutex. Capacity is the only eviction policy; entries have no TTL.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use lru::LruCache;
use serde::Serialize;
use utoipa::ToSchema;

use super::{CacheStore, StorageError, StorageResult};
use crate::auth::Identity;

/// Default number of shards.
const DEFAULT_SHARDS: usize = 16;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Sharded LRU implementation of [`CacheStore`].
pub struct LruCacheStore {
    shards: Vec<Mutex<LruCache<i64, Identity>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruCacheStore {
    /// Create a store holding roughly `capacity` identities.
    pub fn new(capacity: usize) -> Self {
        Self::with_shards(capacity, DEFAULT_SHARDS)
    }

    pub fn with_shards(capacity: usize, shards: usize) -> Self {
        let shards = shards.max(1);
        let per_shard = NonZeroUsize::new(capacity.div_ceil(shards)).unwrap_or(NonZeroUsize::MIN);

        Self {
            shards: (0..shards)
                .map(|_| Mutex::new(LruCache::new(per_shard)))
                .collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn shard(&self, user_id: i64) -> StorageResult<MutexGuard<'_, LruCache<i64, Identity>>> {
        let index = user_id.rem_euclid(self.shards.len() as i64) as usize;
        self.shards[index]
            .lock()
            .map_err(|_| StorageError::Backend("cache shard lock poisoned".to_string()))
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .shards
            .iter()
            .filter_map(|shard| shard.lock().ok().map(|cache| cache.len()))
            .sum();

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[async_trait]
impl CacheStore for LruCacheStore {
    async fn get(&self, user_id: i64) -> StorageResult<Option<Identity>> {
        let found = self.shard(user_id)?.get(&user_id).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        Ok(found)
    }

    async fn set(&self, identity: &Identity) -> StorageResult<()> {
        self.shard(identity.id)?.put(identity.id, identity.clone());
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> StorageResult<()> {
        self.shard(user_id)?.pop(&user_id);
        Ok(())
    }
}
