//! Branded ID newtypes for type safety.
//!
//! Connection and group identifiers are distinct newtype wrappers around
//! `String` so that one can never be passed where the other is expected.
//! Connection IDs are generated as `conn_` + UUID v7 (time-ordered), which
//! keeps log output sortable by connection age.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID with this type's prefix (UUID v7).
            #[must_use]
            pub fn new() -> Self {
                Self(format!(concat!($prefix, "{}"), Uuid::now_v7()))
            }

            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for one live transport connection.
    ConnectionId, "conn_"
}

branded_id! {
    /// Name of a broadcast group (e.g. the well-known support group).
    GroupName, "grp_"
}

impl GroupName {
    /// The well-known group holding every live support-staff connection.
    ///
    /// Server-managed: connections with the support role join it on open
    /// and clients may not join or leave it explicitly.
    #[must_use]
    pub fn support() -> Self {
        Self("support".to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_has_prefix() {
        let id = ConnectionId::new();
        assert!(id.as_str().starts_with("conn_"));
    }

    #[test]
    fn connection_id_suffix_is_uuid_v7() {
        let id = ConnectionId::new();
        let suffix = id.as_str().strip_prefix("conn_").unwrap();
        let parsed = Uuid::parse_str(suffix).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn from_string() {
        let id = ConnectionId::from_string("custom-id".to_owned());
        assert_eq!(id.as_str(), "custom-id");
    }

    #[test]
    fn deref_to_str() {
        let id = ConnectionId::from("hello");
        let s: &str = &id;
        assert_eq!(s, "hello");
    }

    #[test]
    fn display() {
        let id = ConnectionId::from("display-me");
        assert_eq!(format!("{id}"), "display-me");
    }

    #[test]
    fn into_string() {
        let id = GroupName::from("convert");
        let s: String = id.into();
        assert_eq!(s, "convert");
    }

    #[test]
    fn serde_roundtrip_is_transparent() {
        let id = ConnectionId::from("serde-test");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"serde-test\"");
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn hash_and_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let id = ConnectionId::from("same");
        let _ = set.insert(id.clone());
        let _ = set.insert(id.clone());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn default_creates_new() {
        let a = ConnectionId::default();
        let b = ConnectionId::default();
        assert_ne!(a, b, "default should create unique IDs");
    }

    #[test]
    fn support_group_is_well_known() {
        assert_eq!(GroupName::support().as_str(), "support");
        assert_eq!(GroupName::support(), GroupName::support());
    }

    #[test]
    fn into_inner() {
        let id = ConnectionId::from("inner-test");
        assert_eq!(id.into_inner(), "inner-test");
    }
}
