// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access, including user creation and invite generation
/// - `Moderator` - Elevated user; everything a `User` can do
/// - `User` - Default role for every self-registered account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Normal account (the only role public registration can produce)
    User,
    /// Moderation staff
    Moderator,
    /// Full administrative access
    Admin,
}

impl Role {
    /// Every role an admin may assign.
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            // Admin can do anything
            (Role::Admin, _) => true,
            // Moderator covers plain users
            (Role::Moderator, Role::Moderator | Role::User) => true,
            (Role::User, Role::User) => true,
            // Everything else is denied
            _ => false,
        }
    }

    /// Parse role from string (case-insensitive).
    ///
    /// This is the only place untrusted role strings are interpreted.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Role::User),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    /// Default role is User (least privilege).
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        for role in Role::ALL {
            assert!(Role::Admin.has_privilege(role));
        }
    }

    #[test]
    fn moderator_covers_user_only() {
        assert!(Role::Moderator.has_privilege(Role::User));
        assert!(Role::Moderator.has_privilege(Role::Moderator));
        assert!(!Role::Moderator.has_privilege(Role::Admin));
    }

    #[test]
    fn user_only_has_user_privilege() {
        assert!(Role::User.has_privilege(Role::User));
        assert!(!Role::User.has_privilege(Role::Moderator));
        assert!(!Role::User.has_privilege(Role::Admin));
    }

    #[test]
    fn parse_is_case_insensitive_and_closed() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse(" Moderator "), Some(Role::Moderator));
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Moderator).unwrap(), r#""moderator""#);
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
