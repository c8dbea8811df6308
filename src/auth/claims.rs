// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated identity.

use serde::{de, Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by a bearer token.
///
/// Serialized with the registered JWT names: `sub`, `iat`, `exp`, `iss`,
/// `aud`. Issuer and audience hold the same configured value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    #[serde(rename = "sub", deserialize_with = "numeric_subject")]
    pub subject: i64,
    /// Issued at (unix seconds)
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiration (unix seconds)
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "aud")]
    pub audience: String,
}

impl TokenClaims {
    /// Claims for `subject` valid from `issued_at` for `ttl_secs` seconds.
    pub fn new(subject: i64, issuer: impl Into<String>, issued_at: i64, ttl_secs: i64) -> Self {
        let issuer = issuer.into();
        Self {
            subject,
            issued_at,
            expires_at: issued_at.saturating_add(ttl_secs),
            audience: issuer.clone(),
            issuer,
        }
    }
}

/// Accept the subject as a JSON number or a numeric string.
fn numeric_subject<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subject {
        Number(i64),
        Text(String),
    }

    match Subject::deserialize(deserializer)? {
        Subject::Number(id) => Ok(id),
        Subject::Text(text) => text
            .parse()
            .map_err(|_| de::Error::custom(format!("subject {text:?} is not a user id"))),
    }
}

/// Authenticated caller, resolved through the user cache.
///
/// Immutable for the duration of a request; attached to the request
/// extensions by the authentication stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_audience_to_issuer() {
        let claims = TokenClaims::new(7, "socialgateway", 1_700_000_000, 3600);
        assert_eq!(claims.audience, "socialgateway");
        assert_eq!(claims.expires_at, 1_700_003_600);
    }

    #[test]
    fn expiry_saturates_instead_of_overflowing() {
        let claims = TokenClaims::new(7, "iss", 1_700_000_000, i64::MAX);
        assert_eq!(claims.expires_at, i64::MAX);
    }

    #[test]
    fn serializes_registered_claim_names() {
        let claims = TokenClaims::new(7, "iss", 100, 10);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], 7);
        assert_eq!(json["iat"], 100);
        assert_eq!(json["exp"], 110);
        assert_eq!(json["iss"], "iss");
        assert_eq!(json["aud"], "iss");
    }

    #[test]
    fn subject_accepts_numeric_string() {
        let claims: TokenClaims = serde_json::from_str(
            r#"{"sub":"42","iat":1,"exp":2,"iss":"a","aud":"a"}"#,
        )
        .unwrap();
        assert_eq!(claims.subject, 42);
    }

    #[test]
    fn subject_rejects_non_numeric_and_missing() {
        let non_numeric = serde_json::from_str::<TokenClaims>(
            r#"{"sub":"user_123","iat":1,"exp":2,"iss":"a","aud":"a"}"#,
        );
        assert!(non_numeric.is_err());

        let missing =
            serde_json::from_str::<TokenClaims>(r#"{"iat":1,"exp":2,"iss":"a","aud":"a"}"#);
        assert!(missing.is_err());
    }
}
