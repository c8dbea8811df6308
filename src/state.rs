// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::{
    AuthenticationMiddleware, AuthorizationGuard, RoleHierarchyResolver, StaticCredentialGate,
    TokenAuthenticator,
};
use crate::config::AppConfig;
use crate::rate_limit::RateLimiter;
use crate::storage::{
    CacheStore, InMemoryStore, LruCacheStore, PostLoader, RoleLoader, UserCache, UserLoader,
};

/// Backing-store capabilities used by the handlers and the auth layer.
#[derive(Clone)]
pub struct Backend {
    pub users: Arc<dyn UserLoader>,
    pub roles: Arc<dyn RoleLoader>,
    pub posts: Arc<dyn PostLoader>,
}

impl Backend {
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            roles: store.clone(),
            posts: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    pub tokens: Arc<TokenAuthenticator>,
    pub basic_gate: Arc<StaticCredentialGate>,
    pub authn: Arc<AuthenticationMiddleware>,
    pub guard: Arc<AuthorizationGuard>,
    pub limiter: Arc<RateLimiter>,
    /// Present when caching is enabled; kept for the diagnostics endpoint.
    pub cache: Option<Arc<LruCacheStore>>,
    /// Server-wide shutdown token. Request scopes are children of it.
    pub shutdown: CancellationToken,
    pub query_timeout: Duration,
}

impl AppState {
    /// Wire every component from `config` over `backend`.
    pub fn new(config: &AppConfig, backend: Backend, shutdown: CancellationToken) -> Self {
        let tokens = Arc::new(TokenAuthenticator::new(
            &config.auth.signing_secret,
            config.auth.token_issuer.clone(),
            config.auth.token_expiry,
        ));
        let basic_gate = Arc::new(StaticCredentialGate::new(
            config.auth.basic_user.clone(),
            config.auth.basic_pass.clone(),
        ));

        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(LruCacheStore::new(config.cache.capacity)));
        let users = Arc::new(UserCache::new(
            backend.users.clone(),
            cache.clone().map(|store| store as Arc<dyn CacheStore>),
        ));

        let authn = Arc::new(AuthenticationMiddleware::new(tokens.clone(), users));
        let guard = Arc::new(AuthorizationGuard::new(RoleHierarchyResolver::new(
            backend.roles.clone(),
        )));
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.enabled,
            config.rate_limit.requests_per_window,
            config.rate_limit.window,
        ));

        Self {
            backend,
            tokens,
            basic_gate,
            authn,
            guard,
            limiter,
            cache,
            shutdown,
            query_timeout: config.query_timeout,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            &AppConfig::default(),
            Backend::in_memory(Arc::new(InMemoryStore::new())),
            CancellationToken::new(),
        )
    }
}
