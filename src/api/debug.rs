// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operational diagnostics, guarded by the static credential pair.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::rate_limit::RateLimitStats;
use crate::state::AppState;
use crate::storage::CacheStats;

#[derive(Debug, Serialize, ToSchema)]
pub struct DebugVars {
    /// `None` when caching is disabled.
    pub cache: Option<CacheStats>,
    pub rate_limit: RateLimitStats,
}

/// Cache and rate limiter counters.
#[utoipa::path(
    get,
    path = "/v1/debug/vars",
    tag = "Debug",
    security(("basic" = [])),
    responses(
        (status = 200, description = "Runtime counters", body = DebugVars),
        (status = 401, description = "Missing or wrong credentials"),
    )
)]
pub async fn debug_vars(State(state): State<AppState>) -> Json<DebugVars> {
    Json(DebugVars {
        cache: state.cache.as_ref().map(|cache| cache.stats()),
        rate_limit: state.limiter.stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_stats_absent_when_disabled() {
        let Json(vars) = debug_vars(State(AppState::default())).await;
        assert!(vars.cache.is_none());
        assert!(vars.rate_limit.enabled);
        assert_eq!(vars.rate_limit.limit, 20);
    }
}
