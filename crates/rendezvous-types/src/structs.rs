//! Plain value structs shared across the registry and the snapshot store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::NotificationKind;

// ---------------------------------------------------------------------------
// Speaker
// ---------------------------------------------------------------------------

/// A speaker decorating a talk.
///
/// Two speakers are equal when their name and specialty match; the
/// biography is descriptive only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Speaker {
    /// Display name.
    pub name: String,
    /// Field of expertise.
    pub specialty: String,
    /// Free-form biography.
    #[serde(default)]
    pub biography: String,
}

impl Speaker {
    /// Create a speaker with an empty biography.
    pub fn new(name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
            biography: String::new(),
        }
    }

    /// Attach a biography.
    #[must_use]
    pub fn with_biography(mut self, biography: impl Into<String>) -> Self {
        self.biography = biography.into();
        self
    }
}

impl PartialEq for Speaker {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.specialty == other.specialty
    }
}

impl Eq for Speaker {}

impl core::hash::Hash for Speaker {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.specialty.hash(state);
    }
}

impl core::fmt::Display for Speaker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name, self.specialty)
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A single change notification as received by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Which callback delivered it.
    pub kind: NotificationKind,
    /// Name of the event at the time of delivery.
    pub event_name: String,
    /// Human-readable description of the change.
    pub message: String,
    /// Wall-clock time of delivery.
    pub received_at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification stamped with the current time.
    pub fn now(kind: NotificationKind, event_name: &str, message: &str) -> Self {
        Self {
            kind,
            event_name: event_name.to_owned(),
            message: message.to_owned(),
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_equality_ignores_biography() {
        let a = Speaker::new("Ada", "Compilers").with_biography("long bio");
        let b = Speaker::new("Ada", "Compilers");
        assert_eq!(a, b);
        assert_ne!(a, Speaker::new("Ada", "Databases"));
    }

    #[test]
    fn speaker_biography_defaults_when_absent() {
        let parsed: Option<Speaker> =
            serde_json::from_str(r#"{"name":"Grace","specialty":"COBOL"}"#).ok();
        let speaker = parsed.unwrap_or_else(|| Speaker::new("", ""));
        assert_eq!(speaker.name, "Grace");
        assert!(speaker.biography.is_empty());
    }
}
