//! Authorization tiers carried in access tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The role tag embedded in a user's access token.
///
/// A user holds exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including deletes.
    Admin,
    /// May create and update cafes.
    CafeOwner,
    /// Read-only.
    #[default]
    Basic,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::CafeOwner, Role::Basic];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::CafeOwner => "cafe_owner",
            Self::Basic => "basic",
        }
    }

    /// Returns `true` if this role may write cafe records.
    #[must_use]
    pub fn can_write(&self) -> bool {
        matches!(self, Self::Admin | Self::CafeOwner)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "cafe_owner" => Ok(Self::CafeOwner),
            "basic" => Ok(Self::Basic),
            other => Err(CoreError::invalid_role(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        let err = "owner".parse::<Role>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidRole(ref r) if r == "owner"));
    }

    #[test]
    fn test_role_serde_uses_snake_case() {
        let json = serde_json::to_string(&Role::CafeOwner).unwrap();
        assert_eq!(json, "\"cafe_owner\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_write_permissions() {
        assert!(Role::Admin.can_write());
        assert!(Role::CafeOwner.can_write());
        assert!(!Role::Basic.can_write());
        assert!(Role::Admin.is_admin());
        assert!(!Role::CafeOwner.is_admin());
    }
}
