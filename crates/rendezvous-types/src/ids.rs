//! Type-safe identifier wrappers around caller-chosen strings.
//!
//! Events and participants are keyed by identifiers that operators type in
//! (`"T1"`, `"P-042"`), so the wrappers hold a `String` rather than a UUID.
//! The `generate()` constructors are for callers that do not care about the
//! identifier's shape, such as the scratch registry of the observer demo,
//! and use UUID v7.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a caller-chosen identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Create a fresh identifier from a UUID v7 (time-ordered).
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an event (talk or concert).
    EventId
}

define_id! {
    /// Unique identifier for a participant (standard or organizer).
    ParticipantId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_by_content() {
        assert_eq!(EventId::new("T1"), EventId::from("T1"));
        assert_ne!(EventId::new("T1"), EventId::new("T2"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ParticipantId::generate();
        let b = ParticipantId::generate();
        assert_ne!(a, b);
        assert!(!a.is_blank());
    }

    #[test]
    fn blank_detection_ignores_whitespace() {
        assert!(EventId::new("   ").is_blank());
        assert!(EventId::new("").is_blank());
        assert!(!EventId::new(" x ").is_blank());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&ParticipantId::new("P1")).ok();
        assert_eq!(json.as_deref(), Some("\"P1\""));
    }
}
