//! Role hierarchy and the pure authorization table.
//!
//! Roles are totally ordered per studio: `Viewer < Member < Admin < Owner`.
//! Authorization is a pure function of (role, action); no state is consulted
//! here. Code-based viewers are handled by the access session store and never
//! reach this table for room viewing.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Studio-scoped role. Exactly one per (user, studio); Owner is unique per
/// studio and changes hands only through an explicit transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Member,
    Admin,
    Owner,
}

/// Actions gated by the role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewRoom,
    SendChat,
    SendReaction,
    ManageRoom,
    RevokeSession,
    ModerateChat,
    TransferOwnership,
}

impl Action {
    /// Minimum role required for this action.
    #[must_use]
    pub const fn required_role(self) -> Role {
        match self {
            Self::ViewRoom | Self::SendChat | Self::SendReaction => Role::Viewer,
            Self::ManageRoom | Self::RevokeSession | Self::ModerateChat => Role::Admin,
            Self::TransferOwnership => Role::Owner,
        }
    }
}

impl Role {
    /// `authorize(role, action)` from the role model: allowed iff the role
    /// meets the action's minimum.
    #[must_use]
    pub fn allows(self, action: Action) -> bool {
        self >= action.required_role()
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Viewer => write!(f, "viewer"),
            Self::Member => write!(f, "member"),
            Self::Admin => write!(f, "admin"),
            Self::Owner => write!(f, "owner"),
        }
    }
}
