//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `ApartmentId` where an
//! `AccountId` is expected, and keeps account references opaque: callers
//! obtain an `AccountId` from the registry once and can never fabricate a
//! reference out of a raw code string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(
    LedgerScopeId,
    "Unique identifier for a ledger scope (a residential complex / conjunto)."
);
typed_id!(AccountId, "Unique identifier for a chart of accounts entry.");
typed_id!(TransactionId, "Unique identifier for a journal transaction.");
typed_id!(EntryId, "Unique identifier for a journal entry line.");
typed_id!(ClosureId, "Unique identifier for a fiscal period closure.");
typed_id!(UserId, "Unique identifier for a platform user.");
typed_id!(ApartmentId, "Unique identifier for an apartment (third party).");
typed_id!(ProviderId, "Unique identifier for a provider (third party).");
typed_id!(CostCenterId, "Unique identifier for a cost center.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_new_ids_are_unique() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_roundtrip_through_string() {
        let id = TransactionId::new();
        let parsed = TransactionId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_serde_transparent() {
        let id = LedgerScopeId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", Uuid::nil()));
        let back: LedgerScopeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_from_uuid_preserves_value() {
        let raw = Uuid::now_v7();
        assert_eq!(AccountId::from_uuid(raw).into_inner(), raw);
    }
}
