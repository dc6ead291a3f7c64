//! Roles and the effective-role rule used by every privileged path.

use crate::entities::user;

/// Role stored on a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Regular participant
    None,
    /// Owns at least one chat
    Admin,
    /// Manages every chat
    SuperAdmin,
}

impl Role {
    /// Database representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Admin => "admin",
            Self::SuperAdmin => "super-admin",
        }
    }

    /// Parses the stored string; unknown values mean no role.
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "super-admin" => Self::SuperAdmin,
            _ => Self::None,
        }
    }
}

/// Role used for authorization after the operator override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffectiveRole {
    /// Plain user
    User,
    /// Chat admin
    Admin,
    /// Super admin or the fixed operator
    Super,
}

impl EffectiveRole {
    /// True for admins and above.
    pub fn is_admin(self) -> bool {
        self >= Self::Admin
    }

    /// True for super admins and the operator.
    pub fn is_super(self) -> bool {
        self == Self::Super
    }
}

/// Resolves the effective role of `user`.
///
/// The operator id always wins, whatever is stored on the row.
pub fn effective_role(user: &user::Model, operator_id: i64) -> EffectiveRole {
    if user.external_id == operator_id {
        return EffectiveRole::Super;
    }
    match Role::parse(&user.role) {
        Role::SuperAdmin => EffectiveRole::Super,
        Role::Admin => EffectiveRole::Admin,
        Role::None => EffectiveRole::User,
    }
}
