//! Authenticated identity for a connection.
//!
//! Identity is asserted once, at connect time, by an external auth
//! collaborator. Everything downstream (authorization, sender resolution,
//! history scoping) trusts this value and nothing in a request payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric user identifier.
///
/// User IDs come from the surrounding application's relational store, so
/// unlike connection IDs they are integers, not generated strings. `0` is
/// never a valid user id and is treated as "absent" at the protocol edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this id is the absent/zero sentinel.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Role carried by a verified identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A shopper talking to support.
    Customer,
    /// Support/admin staff.
    Support,
}

impl Role {
    /// Whether this role carries support privileges.
    #[must_use]
    pub const fn is_support(self) -> bool {
        matches!(self, Self::Support)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => f.write_str("customer"),
            Self::Support => f.write_str("support"),
        }
    }
}

/// A verified `(user, role)` pair for one connection.
///
/// Produced by the external auth collaborator before the transport is
/// opened; immutable for the life of the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// The authenticated user.
    pub user_id: UserId,
    /// The authenticated role.
    pub role: Role,
}

impl Identity {
    /// Build an identity.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether this identity carries support privileges.
    #[must_use]
    pub const fn is_support(&self) -> bool {
        self.role.is_support()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
