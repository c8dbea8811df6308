// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Backing-store records and the request/response bodies of the REST API.
//! API types derive `Serialize`, `Deserialize`, and `ToSchema` for JSON
//! handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Users**: stored accounts, credentials included
//! - **Posts**: user-owned content, the resource guarded by ownership checks
//! - **Requests**: login and post update bodies

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{Identity, OwnedResource, Role};

// =============================================================================
// Users
// =============================================================================

/// A stored user account.
///
/// Never serialized: the API only ever returns the credential-free
/// [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

// =============================================================================
// Posts
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    /// Owner of the post.
    pub user_id: i64,
    pub title: String,
    pub content: String,
}

impl OwnedResource for Post {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// Partial update of a post. Absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl UpdatePostRequest {
    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
    }
}

// =============================================================================
// Authentication
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ROLE_USER;

    #[test]
    fn identity_drops_credentials() {
        let user = User {
            id: 4,
            username: "dave".to_string(),
            email: "dave@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role: Role::new(1, ROLE_USER, 1),
        };
        let json = serde_json::to_value(user.identity()).unwrap();
        assert_eq!(json["id"], 4);
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn update_applies_only_present_fields() {
        let mut post = Post {
            id: 1,
            user_id: 2,
            title: "old".to_string(),
            content: "body".to_string(),
        };
        let update: UpdatePostRequest = serde_json::from_str(r#"{"title":"new"}"#).unwrap();
        update.apply(&mut post);
        assert_eq!(post.title, "new");
        assert_eq!(post.content, "body");
        assert_eq!(post.owner_id(), 2);
    }
}
