// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ordered request-processing stages.
//!
//! A [`Pipeline`] is an explicit list of [`Stage`]s run in order by a single
//! axum middleware function. Each stage either admits the request (possibly
//! adding to its extensions, e.g. the authenticated [`Identity`]) or rejects
//! it with an [`ApiError`], which ends the run.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pipeline = Arc::new(
//!     Pipeline::new(shutdown.clone(), query_timeout)
//!         .stage(RateLimitStage::new(limiter))
//!         .stage(BearerAuthStage::new(authn)),
//! );
//!
//! let app = Router::new()
//!     .route("/protected", get(handler))
//!     .route_layer(axum::middleware::from_fn_with_state(pipeline, pipeline_middleware));
//! ```
//!
//! [`Identity`]: crate::auth::Identity

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::storage::RequestScope;

/// Client key used when the peer address is unknown (e.g. in-process tests).
pub const UNKNOWN_CLIENT: &str = "unknown";

/// What a stage sees of the request.
pub struct RequestContext<'a> {
    /// Request head: headers, extensions, matched path parameters.
    pub parts: &'a mut Parts,
    /// Rate-limiting key (peer IP).
    pub client_key: String,
    pub scope: RequestScope,
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    root: CancellationToken,
    query_timeout: Duration,
}

impl Pipeline {
    /// `root` is the server-wide token; each request gets a child of it.
    pub fn new(root: CancellationToken, query_timeout: Duration) -> Self {
        Self {
            stages: Vec::new(),
            root,
            query_timeout,
        }
    }

    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    fn new_scope(&self) -> RequestScope {
        RequestScope::new(self.root.child_token(), self.query_timeout)
    }

    /// Run every stage in order, stopping at the first rejection.
    pub async fn run(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
        for stage in &self.stages {
            stage.process(ctx).await?;
        }
        Ok(())
    }
}

/// Axum middleware running `pipeline` before the wrapped handler.
///
/// The first pipeline a request passes through creates its [`RequestScope`]
/// and stores it in the extensions; nested pipelines reuse it. The scope is
/// cancelled once the request completes or its future is dropped (client
/// went away).
pub async fn pipeline_middleware(
    State(pipeline): State<Arc<Pipeline>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let (scope, _cancel_on_drop) = match parts.extensions.get::<RequestScope>() {
        Some(scope) => (scope.clone(), None),
        None => {
            let scope = pipeline.new_scope();
            parts.extensions.insert(scope.clone());
            let guard = scope.cancel_token().clone().drop_guard();
            (scope, Some(guard))
        }
    };

    let mut ctx = RequestContext {
        client_key: client_key(&parts),
        parts: &mut parts,
        scope,
    };

    if let Err(rejection) = pipeline.run(&mut ctx).await {
        return rejection.into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}

fn client_key(parts: &Parts) -> String {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body, http::StatusCode, middleware::from_fn_with_state, routing::get, Extension,
        Router,
    };
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Stage for Record {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn process(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, ctx.client_key));
            Ok(())
        }
    }

    struct Reject;

    #[async_trait]
    impl Stage for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        async fn process(&self, _ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
            Err(ApiError::forbidden())
        }
    }

    /// Cancels `root` and records whether the request's scope followed.
    struct CancelRoot {
        root: CancellationToken,
        scope_cancelled: Arc<Mutex<Option<bool>>>,
    }

    #[async_trait]
    impl Stage for CancelRoot {
        fn name(&self) -> &'static str {
            "cancel_root"
        }

        async fn process(&self, ctx: &mut RequestContext<'_>) -> Result<(), ApiError> {
            self.root.cancel();
            *self.scope_cancelled.lock().unwrap() = Some(ctx.scope.is_cancelled());
            Ok(())
        }
    }

    fn app(pipeline: Pipeline) -> Router {
        Router::new()
            .route("/", get(|| async { "handler" }))
            .layer(from_fn_with_state(Arc::new(pipeline), pipeline_middleware))
    }

    #[tokio::test]
    async fn stages_run_in_order_before_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(CancellationToken::new(), Duration::from_secs(1))
            .stage(Record {
                name: "first",
                log: log.clone(),
            })
            .stage(Record {
                name: "second",
                log: log.clone(),
            });
        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);

        let response = app(pipeline)
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:unknown".to_string(), "second:unknown".to_string()]
        );
    }

    #[tokio::test]
    async fn rejection_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(CancellationToken::new(), Duration::from_secs(1))
            .stage(Reject)
            .stage(Record {
                name: "never",
                log: log.clone(),
            });

        let response = app(pipeline)
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn client_key_uses_peer_ip() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(CancellationToken::new(), Duration::from_secs(1))
            .stage(Record {
                name: "peer",
                log: log.clone(),
            });

        let mut request = axum::http::Request::builder().uri("/").body(Body::empty()).unwrap();
        let addr: SocketAddr = "203.0.113.9:40000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        app(pipeline).oneshot(request).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["peer:203.0.113.9".to_string()]);
    }

    #[tokio::test]
    async fn request_scope_is_child_of_root() {
        let root = CancellationToken::new();
        let pipeline = Pipeline::new(root.clone(), Duration::from_secs(1));
        let scope = pipeline.new_scope();

        root.cancel();
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn scope_is_cancelled_once_the_response_is_produced() {
        let seen = Arc::new(Mutex::new(None::<(RequestScope, bool)>));
        let captured = seen.clone();
        let app = Router::new()
            .route(
                "/",
                get(move |Extension(scope): Extension<RequestScope>| async move {
                    let live = !scope.is_cancelled();
                    *captured.lock().unwrap() = Some((scope, live));
                    "handler"
                }),
            )
            .layer(from_fn_with_state(
                Arc::new(Pipeline::new(CancellationToken::new(), Duration::from_secs(1))),
                pipeline_middleware,
            ));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (scope, live_in_handler) = seen.lock().unwrap().take().unwrap();
        assert!(live_in_handler);
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn nested_pipeline_reuses_outer_scope() {
        let outer_root = CancellationToken::new();
        let inner_root = CancellationToken::new();
        let scope_cancelled = Arc::new(Mutex::new(None));

        let outer = Pipeline::new(outer_root.clone(), Duration::from_secs(1));
        let inner = Pipeline::new(inner_root.clone(), Duration::from_secs(1))
            .stage(CancelRoot {
                root: outer_root,
                scope_cancelled: scope_cancelled.clone(),
            });

        let app = Router::new()
            .route("/", get(|| async { "handler" }))
            .layer(from_fn_with_state(Arc::new(inner), pipeline_middleware))
            .layer(from_fn_with_state(Arc::new(outer), pipeline_middleware));

        app.oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        // The inner stage saw a scope derived from the outer root.
        assert_eq!(*scope_cancelled.lock().unwrap(), Some(true));
        assert!(!inner_root.is_cancelled());
    }
}
