// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    http::{
        header::{RETRY_AFTER, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Challenge sent with every failed basic-auth attempt.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

const INTERNAL_MESSAGE: &str = "the server encountered a problem";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub headers: HeaderMap,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_header(mut self, name: axum::http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn unauthorized_basic() -> Self {
        Self::unauthorized()
            .with_header(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE))
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    /// Opaque 500. Details belong in the logs, never in the body.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    /// 429 with a `Retry-After` in whole seconds, rounded up, at least 1.
    pub fn rate_limited(retry_after: Duration) -> Self {
        let secs = retry_after_secs(retry_after);
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate limit exceeded, retry after: {secs}s"),
        )
        .with_header(RETRY_AFTER, HeaderValue::from(secs))
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// The request was cancelled while a storage call was in flight.
    pub fn cancelled() -> Self {
        Self::unavailable("request cancelled")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

fn retry_after_secs(retry_after: Duration) -> u64 {
    let mut secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs += 1;
    }
    secs.max(1)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, self.headers, body).into_response()
    }
}
