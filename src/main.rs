// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, future::Future, io, net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use social_gateway::{
    api::router,
    auth::ROLE_ADMIN,
    config::{AppConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    rate_limit::spawn_bucket_reaper,
    state::{AppState, Backend},
    storage::InMemoryStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Grace period for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    init_tracing();

    let config = AppConfig::from_env();
    info!(?config, "configuration loaded");

    let store = Arc::new(InMemoryStore::new());
    seed_admin(&store).await;

    let shutdown = CancellationToken::new();
    let state = AppState::new(&config, Backend::in_memory(store), shutdown.clone());
    if state.limiter.is_enabled() {
        spawn_bucket_reaper(state.limiter.clone(), shutdown.child_token());
    }
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("Failed to parse bind address");

    let handle = Handle::<SocketAddr>::new();
    tokio::spawn(shutdown_on(tokio::signal::ctrl_c(), handle.clone(), shutdown));

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    match config.server.tls_paths() {
        Some((cert, key)) => {
            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .expect("Failed to load TLS certificate and key");
            info!(%addr, "social gateway listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(service)
                .await
                .expect("HTTPS server failed");
        }
        None => {
            warn!(%addr, "TLS not configured, serving plain http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(service)
                .await
                .expect("HTTP server failed");
        }
    }

    info!("server stopped");
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    if env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create an admin account from `SEED_ADMIN_EMAIL` / `SEED_ADMIN_PASSWORD`.
async fn seed_admin(store: &InMemoryStore) {
    let (Ok(email), Ok(password)) = (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD"))
    else {
        return;
    };

    match store
        .register_user("admin", email.clone(), &password, ROLE_ADMIN)
        .await
    {
        Ok(user) => info!(user_id = user.id, %email, "seeded admin account"),
        Err(e) => warn!(error = %e, "failed to seed admin account"),
    }
}

/// Wait for `signal`, then cancel every in-flight request scope and drain.
async fn shutdown_on(
    signal: impl Future<Output = io::Result<()>>,
    handle: Handle<SocketAddr>,
    shutdown: CancellationToken,
) {
    if let Err(e) = signal.await {
        warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
    shutdown.cancel();
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_cancels_request_scopes() {
        let shutdown = CancellationToken::new();
        let scope = shutdown.child_token();

        shutdown_on(async { Ok(()) }, Handle::<SocketAddr>::new(), shutdown.clone()).await;
        assert!(shutdown.is_cancelled());
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn failed_signal_listener_keeps_serving() {
        let shutdown = CancellationToken::new();
        let failing = async { Err(io::Error::other("no signal handler")) };

        shutdown_on(failing, Handle::<SocketAddr>::new(), shutdown.clone()).await;
        assert!(!shutdown.is_cancelled());
    }
}
