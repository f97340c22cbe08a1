//! Enums shared by several v1 endpoints.

use serde::{Deserialize, Serialize};

use crate::models::{ChatRole, UserRole};

/// Role of the person asking or correcting.
///
/// Wire format: `"driver"`, `"manager"`, or `"owner"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum V1UserRole {
    /// Weight 1.
    Driver,
    /// Weight 2.
    Manager,
    /// Weight 3.
    Owner,
}

impl From<UserRole> for V1UserRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Driver => V1UserRole::Driver,
            UserRole::Manager => V1UserRole::Manager,
            UserRole::Owner => V1UserRole::Owner,
        }
    }
}

impl From<V1UserRole> for UserRole {
    fn from(role: V1UserRole) -> Self {
        match role {
            V1UserRole::Driver => UserRole::Driver,
            V1UserRole::Manager => UserRole::Manager,
            V1UserRole::Owner => UserRole::Owner,
        }
    }
}

/// Author of a chat history message. Wire format: `"user"` or `"assistant"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum V1ChatRole {
    User,
    Assistant,
}

impl From<V1ChatRole> for ChatRole {
    fn from(role: V1ChatRole) -> Self {
        match role {
            V1ChatRole::User => ChatRole::User,
            V1ChatRole::Assistant => ChatRole::Assistant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_role_roundtrip() {
        for role in UserRole::ALL {
            let v1: V1UserRole = role.into();
            let back: UserRole = v1.into();
            assert_eq!(role, back);
        }
    }

    #[test]
    fn user_role_wire_format() {
        assert_eq!(
            serde_json::to_value(V1UserRole::Owner).unwrap(),
            serde_json::json!("owner")
        );
        assert!(serde_json::from_str::<V1UserRole>("\"dispatcher\"").is_err());
    }
}
