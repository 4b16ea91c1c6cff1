//! Enumeration types for the Rendezvous registry.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// The closed set of event variants.
///
/// Serialized as the `type` discriminator of persisted event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A talk with a theme and an ordered list of speakers.
    Talk,
    /// A concert with an artist and a musical genre.
    Concert,
}

impl EventType {
    /// Lowercase label used in persisted records and log fields.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Talk => "talk",
            Self::Concert => "concert",
        }
    }
}

impl core::fmt::Display for EventType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Talk => write!(f, "Talk"),
            Self::Concert => write!(f, "Concert"),
        }
    }
}

// ---------------------------------------------------------------------------
// Participant roles
// ---------------------------------------------------------------------------

/// The closed set of participant variants.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// A participant who only enrolls in events.
    #[default]
    Standard,
    /// A participant who additionally organizes events.
    Organizer,
}

impl core::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Standard => write!(f, "Participant"),
            Self::Organizer => write!(f, "Organizer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Which subscriber callback a notification is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Membership changed (enrollment or withdrawal).
    Modified,
    /// The event was cancelled.
    Cancelled,
    /// A descriptive field changed (name, date, location, capacity, status).
    InfoChanged,
}

impl core::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Modified => write!(f, "modified"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::InfoChanged => write!(f, "info changed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_serializes_lowercase() {
        let json = serde_json::to_string(&EventType::Concert).ok();
        assert_eq!(json.as_deref(), Some("\"concert\""));
        let parsed: Option<EventType> = serde_json::from_str("\"talk\"").ok();
        assert_eq!(parsed, Some(EventType::Talk));
    }

    #[test]
    fn labels_match_serialized_form() {
        for kind in [EventType::Talk, EventType::Concert] {
            let json = serde_json::to_string(&kind).unwrap_or_default();
            assert_eq!(json.trim_matches('"'), kind.label());
        }
    }
}
