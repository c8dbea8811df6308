// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. A missing or
//! unparsable value falls back to its default and logs a warning; startup
//! never fails on configuration.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH_TOKEN_EXP` | Bearer token lifetime | `3d` |
//! | `AUTH_TOKEN_ISS` | Token issuer and audience | `socialgateway` |
//! | `AUTH_TOKEN_SECRET` | HS256 signing secret | `example` |
//! | `AUTH_BASIC_USER` | Operational endpoints username | `admin` |
//! | `AUTH_BASIC_PASS` | Operational endpoints password | `admin` |
//! | `CACHE_ENABLED` | Cache identities between requests | `false` |
//! | `CACHE_CAPACITY` | Maximum cached identities | `10000` |
//! | `RATELIMITER_ENABLED` | Enable per-client rate limiting | `true` |
//! | `RATELIMITER_REQUESTS_COUNT` | Requests allowed per window | `20` |
//! | `RATELIMITER_WINDOW` | Rate limit window | `5s` |
//! | `QUERY_TIMEOUT` | Upper bound for one storage call | `5s` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` | PEM certificate chain, enables TLS with `TLS_KEY_PATH` | unset |
//! | `TLS_KEY_PATH` | PEM private key | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Durations use `humantime` syntax (`15m`, `3d`, `5s`).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const AUTH_TOKEN_EXP_ENV: &str = "AUTH_TOKEN_EXP";
pub const AUTH_TOKEN_ISS_ENV: &str = "AUTH_TOKEN_ISS";
pub const AUTH_TOKEN_SECRET_ENV: &str = "AUTH_TOKEN_SECRET";
pub const AUTH_BASIC_USER_ENV: &str = "AUTH_BASIC_USER";
pub const AUTH_BASIC_PASS_ENV: &str = "AUTH_BASIC_PASS";
pub const CACHE_ENABLED_ENV: &str = "CACHE_ENABLED";
pub const CACHE_CAPACITY_ENV: &str = "CACHE_CAPACITY";
pub const RATELIMITER_ENABLED_ENV: &str = "RATELIMITER_ENABLED";
pub const RATELIMITER_REQUESTS_COUNT_ENV: &str = "RATELIMITER_REQUESTS_COUNT";
pub const RATELIMITER_WINDOW_ENV: &str = "RATELIMITER_WINDOW";
pub const QUERY_TIMEOUT_ENV: &str = "QUERY_TIMEOUT";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// Environment variable selecting the log output format.
///
/// `json` for structured logs, anything else for human-readable output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_TOKEN_EXPIRY: Duration = Duration::from_secs(3 * 24 * 60 * 60);
const DEFAULT_ISSUER: &str = "socialgateway";
const DEFAULT_SECRET: &str = "example";
const DEFAULT_BASIC_USER: &str = "admin";
const DEFAULT_BASIC_PASS: &str = "admin";
const DEFAULT_CACHE_CAPACITY: usize = 10_000;
const DEFAULT_RATE_LIMIT: u32 = 20;
const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(5);
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub token_expiry: Duration,
    pub token_issuer: String,
    pub signing_secret: String,
    pub basic_user: String,
    pub basic_pass: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

impl ServerConfig {
    /// Both paths, when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub server: ServerConfig,
    pub query_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let optional = |key: &str| lookup(key).filter(|value| !value.is_empty());

        Self {
            auth: AuthConfig {
                token_expiry: parse_or(
                    &lookup,
                    AUTH_TOKEN_EXP_ENV,
                    DEFAULT_TOKEN_EXPIRY,
                    parse_duration,
                ),
                token_issuer: string(AUTH_TOKEN_ISS_ENV, DEFAULT_ISSUER),
                signing_secret: string(AUTH_TOKEN_SECRET_ENV, DEFAULT_SECRET),
                basic_user: string(AUTH_BASIC_USER_ENV, DEFAULT_BASIC_USER),
                basic_pass: string(AUTH_BASIC_PASS_ENV, DEFAULT_BASIC_PASS),
            },
            cache: CacheConfig {
                enabled: parse_or(&lookup, CACHE_ENABLED_ENV, false, parse_bool),
                capacity: parse_or(
                    &lookup,
                    CACHE_CAPACITY_ENV,
                    DEFAULT_CACHE_CAPACITY,
                    parse_from_str,
                ),
            },
            rate_limit: RateLimitConfig {
                enabled: parse_or(&lookup, RATELIMITER_ENABLED_ENV, true, parse_bool),
                requests_per_window: parse_or(
                    &lookup,
                    RATELIMITER_REQUESTS_COUNT_ENV,
                    DEFAULT_RATE_LIMIT,
                    parse_from_str,
                ),
                window: parse_or(
                    &lookup,
                    RATELIMITER_WINDOW_ENV,
                    DEFAULT_RATE_WINDOW,
                    parse_duration,
                ),
            },
            server: ServerConfig {
                host: string(HOST_ENV, DEFAULT_HOST),
                port: parse_or(&lookup, PORT_ENV, DEFAULT_PORT, parse_from_str),
                tls_cert_path: optional(TLS_CERT_PATH_ENV),
                tls_key_path: optional(TLS_KEY_PATH_ENV),
            },
            query_timeout: parse_or(
                &lookup,
                QUERY_TIMEOUT_ENV,
                crate::storage::DEFAULT_QUERY_TIMEOUT,
                parse_duration,
            ),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_expiry", &self.token_expiry)
            .field("token_issuer", &self.token_issuer)
            .field("signing_secret", &"<redacted>")
            .field("basic_user", &self.basic_user)
            .field("basic_pass", &"<redacted>")
            .finish()
    }
}

fn parse_or<F, T, P>(lookup: &F, key: &str, default: T, parse: P) -> T
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let Some(raw) = lookup(key).filter(|value| !value.is_empty()) else {
        return default;
    };
    match parse(raw.trim()) {
        Some(value) => value,
        None => {
            warn!(key, value = %raw, "invalid configuration value, using default");
            default
        }
    }
}

fn parse_duration(raw: &str) -> Option<Duration> {
    humantime::parse_duration(raw).ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_from_str<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}
