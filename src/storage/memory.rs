// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory backing store.
//!
//! Implements every capability trait over plain hash maps. Used by the binary
//! when no external database is wired in, and by the tests. Load counters let
//! tests observe whether a call reached the store or was served by the cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PostLoader, RoleLoader, StorageError, StorageResult, UserLoader};
use crate::auth::{password, Role, ROLE_ADMIN, ROLE_MODERATOR, ROLE_USER};
use crate::models::{Post, User};

pub struct InMemoryStore {
    users: RwLock<HashMap<i64, User>>,
    roles: RwLock<HashMap<String, Role>>,
    posts: RwLock<HashMap<i64, Post>>,
    next_user_id: AtomicI64,
    next_post_id: AtomicI64,
    user_loads: AtomicUsize,
}

impl InMemoryStore {
    /// Create a store seeded with the default role hierarchy
    /// (`user` < `moderator` < `admin`).
    pub fn new() -> Self {
        let roles = [
            Role::new(1, ROLE_USER, 1),
            Role::new(2, ROLE_MODERATOR, 2),
            Role::new(3, ROLE_ADMIN, 3),
        ]
        .into_iter()
        .map(|role| (role.name.clone(), role))
        .collect();

        Self {
            users: RwLock::new(HashMap::new()),
            roles: RwLock::new(roles),
            posts: RwLock::new(HashMap::new()),
            next_user_id: AtomicI64::new(1),
            next_post_id: AtomicI64::new(1),
            user_loads: AtomicUsize::new(0),
        }
    }

    /// Insert a user with an already hashed password.
    pub async fn insert_user(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role_name: &str,
    ) -> StorageResult<User> {
        let role = self.load_role_by_name(role_name).await?;
        let email = email.into();

        let mut users = self.users.write().await;
        if users.values().any(|user| user.email == email) {
            return Err(StorageError::Backend(format!("duplicate email {email}")));
        }

        let user = User {
            id: self.next_user_id.fetch_add(1, Ordering::Relaxed),
            username: username.into(),
            email,
            password_hash: password_hash.into(),
            role,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Hash `plain_password` and insert the user.
    pub async fn register_user(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
        plain_password: &str,
        role_name: &str,
    ) -> StorageResult<User> {
        let hash = password::hash_password(plain_password)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        self.insert_user(username, email, hash, role_name).await
    }

    /// Change a user's role without touching any cache.
    pub async fn set_user_role(&self, user_id: i64, role_name: &str) -> StorageResult<()> {
        let role = self.load_role_by_name(role_name).await?;
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or(StorageError::NotFound)?;
        user.role = role;
        Ok(())
    }

    pub async fn insert_post(
        &self,
        user_id: i64,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Post {
        let post = Post {
            id: self.next_post_id.fetch_add(1, Ordering::Relaxed),
            user_id,
            title: title.into(),
            content: content.into(),
        };
        self.posts.write().await.insert(post.id, post.clone());
        post
    }

    /// Number of `load_user_by_id` calls served so far.
    pub fn user_loads(&self) -> usize {
        self.user_loads.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserLoader for InMemoryStore {
    async fn load_user_by_id(&self, id: i64) -> StorageResult<User> {
        self.user_loads.fetch_add(1, Ordering::Relaxed);
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn load_user_by_email(&self, email: &str) -> StorageResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl RoleLoader for InMemoryStore {
    async fn load_role_by_name(&self, name: &str) -> StorageResult<Role> {
        self.roles
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl PostLoader for InMemoryStore {
    async fn load_post(&self, id: i64) -> StorageResult<Post> {
        self.posts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn update_post(&self, post: &Post) -> StorageResult<()> {
        let mut posts = self.posts.write().await;
        let stored = posts.get_mut(&post.id).ok_or(StorageError::NotFound)?;
        *stored = post.clone();
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> StorageResult<()> {
        self.posts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}
