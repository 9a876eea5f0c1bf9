//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Requests and their owners carry strongly-typed IDs so that a request id
//! can never be passed where an owner id is expected. All IDs use UUID v7
//! (time-ordered) so that ids sort by creation order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a single request submitted to a manager.
    RequestId
}

define_id! {
    /// Identifier for the logical behavior that submits requests.
    ///
    /// A behavior keeps the same owner id across ticks so that a manager can
    /// tell a refreshed request apart from a competing one.
    OwnerId
}

define_id! {
    /// Unique identifier for a task failure report.
    ReportId
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let request = RequestId::new();
        let owner = OwnerId::new();
        assert_ne!(request.into_inner(), Uuid::nil());
        assert_ne!(owner.into_inner(), Uuid::nil());
    }

    #[test]
    fn ids_are_time_ordered() {
        let first = RequestId::new();
        let second = RequestId::new();
        assert!(first < second);
    }

    #[test]
    fn id_display_matches_uuid() {
        let uuid = Uuid::now_v7();
        let id = OwnerId::from(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = ReportId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: ReportId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
