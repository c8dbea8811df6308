// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.
//!
//! ## Role Hierarchy
//!
//! Roles are totally ordered by `level`; a higher level holds every
//! permission of the lower ones. The seeded hierarchy is:
//!
//! - `user` (1) - Normal account
//! - `moderator` (2) - May edit content of other users
//! - `admin` (3) - May delete content of other users

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::{RequestScope, RoleLoader, StorageResult};

pub const ROLE_USER: &str = "user";
pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub level: i32,
}

impl Role {
    pub fn new(id: i64, name: impl Into<String>, level: i32) -> Self {
        Self {
            id,
            name: name.into(),
            level,
        }
    }

    /// Check if this role has at least the privileges of `required`.
    pub fn has_privilege(&self, required: &Role) -> bool {
        self.level >= required.level
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (level {})", self.name, self.level)
    }
}

/// Compares a caller's role against a role resolved by name.
pub struct RoleHierarchyResolver {
    roles: Arc<dyn RoleLoader>,
}

impl RoleHierarchyResolver {
    pub fn new(roles: Arc<dyn RoleLoader>) -> Self {
        Self { roles }
    }

    /// `true` when `user_role` is at or above the level of `required_role`.
    ///
    /// An unknown role name is a configuration defect and is returned as an
    /// error, never as `false`.
    pub async fn covers(
        &self,
        user_role: &Role,
        required_role: &str,
        scope: &RequestScope,
    ) -> StorageResult<bool> {
        let required = scope.run(self.roles.load_role_by_name(required_role)).await?;
        Ok(user_role.has_privilege(&required))
    }
}
