// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token issuance and verification (HS256).
//!
//! The authenticator holds no mutable state: it is a pure function of its
//! configuration and the current time, so it is shared across requests
//! without locking.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, TokenClaims};

pub struct TokenAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    expiry: Duration,
}

impl TokenAuthenticator {
    /// Create an authenticator signing with `secret`.
    ///
    /// `issuer` is expected both as `iss` and as `aud` on validation.
    pub fn new(secret: &str, issuer: impl Into<String>, expiry: Duration) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            expiry,
        }
    }

    /// Build claims for `user_id` starting now and sign them.
    pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        let ttl = i64::try_from(self.expiry.as_secs()).unwrap_or(i64::MAX / 2);
        let claims = TokenClaims::new(user_id, self.issuer.clone(), Utc::now().timestamp(), ttl);
        self.generate_token(&claims)
    }

    /// Serialize and sign `claims`.
    pub fn generate_token(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    /// Verify signature, issuer, audience and expiry, returning the claims.
    pub fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate_token_at(token, Utc::now().timestamp())
    }

    pub(crate) fn validate_token_at(
        &self,
        token: &str,
        now: i64,
    ) -> Result<TokenClaims, AuthError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| classify(e.kind()))?
            .claims;

        // The library accepts `exp == now`; a token is only valid strictly before expiry.
        if claims.expires_at <= now {
            return Err(AuthError::ExpiredToken);
        }

        Ok(claims)
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
        ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
        ErrorKind::MissingRequiredClaim(claim) if claim.as_str() == "iss" => {
            AuthError::IssuerMismatch
        }
        ErrorKind::MissingRequiredClaim(claim) if claim.as_str() == "aud" => {
            AuthError::AudienceMismatch
        }
        _ => AuthError::MalformedCredentials,
    }
}
