use std::str::FromStr;

use chrono::{DateTime, Utc};
use qatrail_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Application roles, totally ordered by review authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Engineer-in-training; may open items and add reviews.
    JuniorEngineer,
    /// Senior reviewing engineer; may resolve items.
    SeniorEngineer,
    /// Project manager; may verify and close items.
    Pm,
    /// Administrator; no restrictions.
    Admin,
}

impl Role {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JuniorEngineer => "junior_engineer",
            Self::SeniorEngineer => "senior_engineer",
            Self::Pm => "pm",
            Self::Admin => "admin",
        }
    }

    /// Returns all known roles, least privileged first.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[
            Role::JuniorEngineer,
            Role::SeniorEngineer,
            Role::Pm,
            Role::Admin,
        ];

        ALL
    }

    /// Returns whether this role meets or exceeds `required`.
    #[must_use]
    pub fn at_least(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            Self::JuniorEngineer => 0,
            Self::SeniorEngineer => 1,
            Self::Pm => 2,
            Self::Admin => 3,
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "junior_engineer" => Ok(Self::JuniorEngineer),
            "senior_engineer" => Ok(Self::SeniorEngineer),
            "pm" => Ok(Self::Pm),
            "admin" => Ok(Self::Admin),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

/// Caller identity resolved by the authentication collaborator.
///
/// The engine trusts this input and performs no credential verification;
/// the role is the one resolved for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Profile identifier of the caller.
    pub user_id: UserId,
    /// Role resolved for this request.
    pub role: Role,
}

impl Actor {
    /// Creates an actor from resolved identity data.
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Durable user profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable profile identifier.
    pub id: UserId,
    /// Display name, if the user provided one.
    pub full_name: Option<String>,
    /// Email address, if known.
    pub email: Option<String>,
    /// Avatar image URL, if set.
    pub avatar_url: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Unique identifier for a role assignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRoleId(Uuid);

impl UserRoleId {
    /// Creates a new random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserRoleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Role assignment for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    /// Stable assignment identifier.
    pub id: UserRoleId,
    /// User the role is assigned to.
    pub user_id: UserId,
    /// Assigned role.
    pub role: Role,
    /// Assignment timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Role;

    #[test]
    fn role_roundtrip_storage_value() {
        for role in Role::all() {
            let restored = Role::from_str(role.as_str());
            assert!(restored.is_ok());
            assert_eq!(restored.unwrap_or(Role::JuniorEngineer), *role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::from_str("night_vision").is_err());
        assert!(Role::from_str("").is_err());
    }

    #[test]
    fn role_ordering_is_total() {
        assert!(Role::Admin.at_least(Role::Pm));
        assert!(Role::Pm.at_least(Role::SeniorEngineer));
        assert!(Role::SeniorEngineer.at_least(Role::JuniorEngineer));
        assert!(!Role::JuniorEngineer.at_least(Role::SeniorEngineer));
        assert!(!Role::SeniorEngineer.at_least(Role::Pm));
    }
}
