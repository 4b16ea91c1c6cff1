//! The on-disk snapshot shape.
//!
//! Records mirror the JSON document field for field (camelCase keys). They
//! carry no behavior beyond conversion to and from registry entities.
//! Subscriptions have no record: they are derived from each event's
//! `participants` list on load.

use chrono::{DateTime, NaiveDateTime, Utc};
use rendezvous_registry::{Event, EventDetails, EventParams, EventView, Participant, RegistryStats};
use rendezvous_types::{EventId, EventType, ParticipantId, ParticipantRole, Speaker};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// A persisted participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    /// Participant id.
    pub id: ParticipantId,
    /// Display name.
    #[validate(length(min = 1))]
    pub name: String,
    /// Contact email.
    #[validate(email)]
    pub email: String,
    /// Explicit role tag. Optional; `organizedEvents` alone marks an organizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ParticipantRole>,
    /// Organized event ids. Present, possibly empty, on every organizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organized_events: Option<Vec<EventId>>,
}

impl ParticipantRecord {
    /// Capture a participant.
    pub fn from_participant(participant: &Participant) -> Self {
        Self {
            id: participant.id().clone(),
            name: participant.name().to_owned(),
            email: participant.email().to_owned(),
            role: Some(participant.role()),
            organized_events: participant.organized_events(),
        }
    }

    /// Whether the record describes an organizer.
    pub fn is_organizer(&self) -> bool {
        self.organized_events.is_some() || self.role == Some(ParticipantRole::Organizer)
    }

    /// Organized event ids, empty for standard participants.
    pub fn organized(&self) -> &[EventId] {
        self.organized_events.as_deref().unwrap_or_default()
    }

    /// Build the participant this record describes.
    pub fn to_participant(&self) -> Participant {
        if !self.is_organizer() {
            return Participant::new(self.id.clone(), self.name.clone(), self.email.clone());
        }
        let organizer =
            Participant::organizer(self.id.clone(), self.name.clone(), self.email.clone());
        for event in self.organized() {
            organizer.add_organized_event(event.clone());
        }
        organizer
    }
}

/// An entry of an event's participant list.
///
/// Format 1.1 stores bare ids; format 1.0 embedded whole participant
/// objects. Both resolve against the top-level participant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnrolledRef {
    /// Reference by id.
    Id(ParticipantId),
    /// Embedded copy (legacy).
    Embedded(ParticipantRecord),
}

impl EnrolledRef {
    /// The referenced participant id.
    pub const fn id(&self) -> &ParticipantId {
        match self {
            Self::Id(id) => id,
            Self::Embedded(record) => &record.id,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Variant data of a persisted event, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventKindRecord {
    /// A talk.
    Talk {
        /// Subject.
        theme: String,
        /// Speakers in order.
        #[serde(default)]
        speakers: Vec<Speaker>,
    },
    /// A concert.
    Concert {
        /// Performing artist.
        artist: String,
        /// Musical genre.
        genre: String,
    },
}

impl EventKindRecord {
    /// The variant tag.
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Talk { .. } => EventType::Talk,
            Self::Concert { .. } => EventType::Concert,
        }
    }
}

/// A persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event id.
    pub id: EventId,
    /// Display name.
    #[validate(length(min = 1))]
    pub name: String,
    /// Scheduled start (`YYYY-MM-DDTHH:MM:SS`).
    pub date: NaiveDateTime,
    /// Venue.
    pub location: String,
    /// Maximum capacity.
    #[validate(range(min = 1))]
    pub capacity_max: u32,
    /// Whether the event is cancelled.
    #[serde(default)]
    pub cancelled: bool,
    /// Enrolled participants, in enrollment order.
    #[serde(default)]
    pub participants: Vec<EnrolledRef>,
    /// Variant data.
    #[serde(flatten)]
    pub kind: EventKindRecord,
}

impl EventRecord {
    /// Capture an event from a consistent view.
    pub fn from_view(view: EventView) -> Self {
        let kind = match view.details {
            EventDetails::Talk { theme, speakers } => EventKindRecord::Talk { theme, speakers },
            EventDetails::Concert { artist, genre } => EventKindRecord::Concert { artist, genre },
        };
        Self {
            id: view.id,
            name: view.name,
            date: view.date,
            location: view.location,
            capacity_max: view.capacity,
            cancelled: view.cancelled,
            participants: view.enrolled.into_iter().map(EnrolledRef::Id).collect(),
            kind,
        }
    }

    /// Capture an event.
    pub fn from_event(event: &Event) -> Self {
        Self::from_view(event.view())
    }

    /// The common constructor fields.
    pub fn params(&self) -> EventParams {
        EventParams::new(
            self.id.clone(),
            self.name.clone(),
            self.date,
            self.location.clone(),
            self.capacity_max,
        )
    }

    /// The variant data.
    pub fn details(&self) -> EventDetails {
        match &self.kind {
            EventKindRecord::Talk { theme, speakers } => EventDetails::Talk {
                theme: theme.clone(),
                speakers: speakers.clone(),
            },
            EventKindRecord::Concert { artist, genre } => EventDetails::Concert {
                artist: artist.clone(),
                genre: genre.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Aggregate figures recorded at save time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    /// Number of talks.
    pub talk_count: usize,
    /// Number of concerts.
    pub concert_count: usize,
    /// Number of organizers.
    pub organizer_count: usize,
    /// Number of standard (non-organizer) participants.
    pub participant_count: usize,
    /// Sum of enrolled participants over all events.
    pub total_enrollments: u64,
    /// Mean occupancy percentage; absent when there are no events.
    #[serde(default)]
    pub avg_occupancy_pct: Option<Decimal>,
}

impl From<&RegistryStats> for SnapshotStats {
    fn from(stats: &RegistryStats) -> Self {
        Self {
            talk_count: stats.talk_count,
            concert_count: stats.concert_count,
            organizer_count: stats.organizer_count,
            participant_count: stats.standard_count(),
            total_enrollments: stats.total_enrollments,
            avg_occupancy_pct: stats.average_occupancy_pct,
        }
    }
}

/// The complete persisted registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    /// Every event.
    pub events: Vec<EventRecord>,
    /// Every participant (the canonical copies).
    pub participants: Vec<ParticipantRecord>,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
    /// Version of the application that wrote it.
    pub app_version: String,
    /// Layout of `events[].participants`.
    pub format_version: String,
    /// Subscriber count summed over events when saved, observers included.
    #[serde(default)]
    pub total_subscribers_at_save: u64,
    /// Free-form note.
    #[serde(default)]
    pub comment: String,
    /// Aggregate figures; older snapshots omit them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SnapshotStats>,
}
