// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static credential gate for operational endpoints.
//!
//! Verifies an HTTP `Basic` credential against one configured
//! username/password pair. The pair is not hashed: this tier guards a narrow
//! operational boundary, not end-user accounts. Comparisons go through
//! HMAC-SHA256 tags so they run in constant time.

use axum::http::HeaderValue;
use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub struct StaticCredentialGate {
    username: String,
    password: String,
}

impl StaticCredentialGate {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check an `Authorization` header value.
    ///
    /// Every failure is returned as an [`AuthError`]; callers answer all of
    /// them identically with a `Basic` challenge.
    pub fn verify(&self, header: Option<&HeaderValue>) -> Result<(), AuthError> {
        let header = header
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::MalformedCredentials)?;

        let encoded = match header.split(' ').collect::<Vec<_>>().as_slice() {
            ["Basic", encoded] => *encoded,
            _ => return Err(AuthError::MalformedCredentials),
        };

        let decoded = Base64::decode_vec(encoded).map_err(|_| AuthError::MalformedCredentials)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MalformedCredentials)?;

        // Evaluate both so a wrong username costs the same as a wrong password.
        let username_ok = constant_time_eq(&self.username, username);
        let password_ok = constant_time_eq(&self.password, password);
        if username_ok & password_ok {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn constant_time_eq(expected: &str, candidate: &str) -> bool {
    let tag = |value: &str| {
        HmacSha256::new_from_slice(expected.as_bytes()).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };

    match (tag(candidate), tag(expected)) {
        (Ok(candidate), Ok(expected)) => expected
            .verify_slice(&candidate.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> StaticCredentialGate {
        StaticCredentialGate::new("admin", "s3cret:pass")
    }

    fn header(raw: &str) -> HeaderValue {
        HeaderValue::from_str(raw).unwrap()
    }

    fn basic(credentials: &str) -> HeaderValue {
        header(&format!("Basic {}", Base64::encode_string(credentials.as_bytes())))
    }

    #[test]
    fn correct_credentials_pass() {
        assert!(gate().verify(Some(&basic("admin:s3cret:pass"))).is_ok());
    }

    #[test]
    fn password_split_on_first_colon_only() {
        // The configured password itself contains a colon.
        assert!(gate().verify(Some(&basic("admin:s3cret:pass"))).is_ok());
        assert!(gate().verify(Some(&basic("admin:s3cret"))).is_err());
    }

    #[test]
    fn one_wrong_character_fails() {
        let result = gate().verify(Some(&basic("admin:s3cret:pasS")));
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn wrong_username_fails() {
        let result = gate().verify(Some(&basic("root:s3cret:pass")));
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn missing_header_fails() {
        assert!(matches!(gate().verify(None), Err(AuthError::MissingCredentials)));
        assert!(matches!(
            gate().verify(Some(&header(""))),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn malformed_headers_fail() {
        for raw in [
            "Bearer abc",
            "Basic",
            "Basic not base64!",
            "basic YWRtaW46eA==",
            "Basic YWRtaW4=", // "admin" without a colon
        ] {
            assert!(
                matches!(gate().verify(Some(&header(raw))), Err(AuthError::MalformedCredentials)),
                "{raw}"
            );
        }
    }

    #[test]
    fn constant_time_eq_compares_exactly() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("abc", ""));
    }
}
