// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface.
//!
//! ## Request Pipelines
//!
//! | Routes | Stages |
//! |--------|--------|
//! | every `/v1` route | rate limit |
//! | `/v1/users/me`, `/v1/posts/{post_id}` | + bearer authentication |
//! | `GET /v1/posts/{post_id}` | + post lookup |
//! | `PATCH /v1/posts/{post_id}` | + post lookup, owner or `moderator` |
//! | `DELETE /v1/posts/{post_id}` | + post lookup, owner or `admin` |
//! | `/v1/debug/vars` | + basic authentication |

use std::sync::Arc;

use axum::{
    handler::Handler,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        AuthorizationStage, BasicAuthStage, BearerAuthStage, Identity, Role, ROLE_ADMIN,
        ROLE_MODERATOR,
    },
    models::{LoginRequest, Post, UpdatePostRequest},
    pipeline::{pipeline_middleware, Pipeline},
    rate_limit::{RateLimitStage, RateLimitStats},
    state::AppState,
    storage::CacheStats,
};

pub mod auth;
pub mod debug;
pub mod health;
pub mod posts;
pub mod users;

use posts::PostContextStage;

pub fn router(state: AppState) -> Router {
    let new_pipeline = || Pipeline::new(state.shutdown.clone(), state.query_timeout);

    let rate_limit = Arc::new(new_pipeline().stage(RateLimitStage::new(state.limiter.clone())));
    let bearer = Arc::new(new_pipeline().stage(BearerAuthStage::new(state.authn.clone())));
    let basic = Arc::new(new_pipeline().stage(BasicAuthStage::new(state.basic_gate.clone())));

    let post_stages = |required_role: Option<&str>| {
        let mut pipeline =
            new_pipeline().stage(PostContextStage::new(state.backend.posts.clone()));
        if let Some(role) = required_role {
            pipeline = pipeline.stage(AuthorizationStage::new(state.guard.clone(), role));
        }
        from_fn_with_state(Arc::new(pipeline), pipeline_middleware)
    };

    let authenticated = Router::new()
        .route("/users/me", get(users::get_current_user))
        .route(
            "/posts/{post_id}",
            get(posts::get_post.layer(post_stages(None)))
                .patch(posts::update_post.layer(post_stages(Some(ROLE_MODERATOR))))
                .delete(posts::delete_post.layer(post_stages(Some(ROLE_ADMIN)))),
        )
        .route_layer(from_fn_with_state(bearer, pipeline_middleware));

    let operational = Router::new()
        .route("/debug/vars", get(debug::debug_vars))
        .route_layer(from_fn_with_state(basic, pipeline_middleware));

    let v1_routes = Router::new()
        .route("/authentication/token", post(auth::create_token))
        .route("/health", get(health::health))
        .merge(authenticated)
        .merge(operational);
    let v1_routes = v1_routes.with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .layer(from_fn_with_state(rate_limit, pipeline_middleware))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "basic",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::create_token,
        users::get_current_user,
        posts::get_post,
        posts::update_post,
        posts::delete_post,
        debug::debug_vars,
        health::health
    ),
    components(
        schemas(
            Identity,
            Role,
            Post,
            LoginRequest,
            UpdatePostRequest,
            CacheStats,
            RateLimitStats,
            debug::DebugVars,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Token issuance"),
        (name = "Users", description = "Current user"),
        (name = "Posts", description = "Owner or role protected posts"),
        (name = "Debug", description = "Operational counters"),
        (name = "Health", description = "Liveness")
    )
)]
struct ApiDoc;
