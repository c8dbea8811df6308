// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-client fixed-window rate limiting.
//!
//! Each client key (the peer IP) owns a bucket holding a window start and a
//! remaining-request counter. The counter resets to the configured limit once
//! the window has elapsed. Bursts at window boundaries are allowed: a client
//! may spend its whole quota at the end of one window and again at the start
//! of the next.
//!
//! Buckets live in a [`DashMap`], so concurrent requests for different keys
//! only contend when they land on the same shard.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::pipeline::{RequestContext, Stage};

/// How often the background reaper drops idle buckets.
pub const REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    remaining: u32,
    window_start: Instant,
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Time until the current window ends. Zero when allowed.
    pub retry_after: Duration,
}

impl RateDecision {
    const ALLOW: Self = Self {
        allowed: true,
        retry_after: Duration::ZERO,
    };
}

/// Limiter counters exposed on the diagnostics endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RateLimitStats {
    pub enabled: bool,
    pub limit: u32,
    pub window_secs: u64,
    pub tracked_keys: usize,
}

pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    enabled: bool,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(enabled: bool, limit: u32, window: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            enabled,
            limit,
            window,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, 0, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn allow(&self, key: &str) -> RateDecision {
        self.allow_at(key, Instant::now())
    }

    /// Admission check against an explicit clock reading.
    pub fn allow_at(&self, key: &str, now: Instant) -> RateDecision {
        if !self.enabled {
            return RateDecision::ALLOW;
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            remaining: self.limit,
            window_start: now,
        });

        // The window is half-open: a denial always has a non-zero retry-after.
        if now.saturating_duration_since(bucket.window_start) >= self.window {
            bucket.window_start = now;
            bucket.remaining = self.limit;
        }

        if bucket.remaining > 0 {
            bucket.remaining -= 1;
            return RateDecision::ALLOW;
        }

        let retry_after = bucket
            .window_start
            .checked_add(self.window)
            .map_or(self.window, |window_end| window_end.saturating_duration_since(now));
        RateDecision {
            allowed: false,
            retry_after,
        }
    }

    /// Drop buckets whose window has already elapsed at `now`.
    ///
    /// A dropped bucket would have been reset on its next use anyway, so
    /// this never changes an admission decision. Returns how many were
    /// removed.
    pub fn retain_active(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.window_start) < self.window);
        before.saturating_sub(self.buckets.len())
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            enabled: self.enabled,
            limit: self.limit,
            window_secs: self.window.as_secs(),
            tracked_keys: self.buckets.len(),
        }
    }
}

/// Spawn a background task that periodically drops idle buckets.
///
/// The task stops when `shutdown` is cancelled.
pub fn spawn_bucket_reaper(
    limiter: Arc<RateLimiter>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REAPER_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let removed = limiter.retain_active(Instant::now());
                    if removed > 0 {
                        debug!(removed, "rate limiter buckets reaped");
                    }
                }
            }
        }
    })
}

/// Rejects the request with `429` once its client key is over quota.
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn process(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
        let decision = self.limiter.allow(&ctx.client_key);
        if decision.allowed {
            return Ok(());
        }

        warn!(
            client = %ctx.client_key,
            retry_after = ?decision.retry_after,
            path = ctx.parts.uri.path(),
            "rate limit exceeded"
        );
        Err(ApiError::rate_limited(decision.retry_after))
    }
}
