//! Error types for the `rendezvous-registry` crate.
//!
//! Every business rule violation is a typed [`RegistryError`] returned to
//! the immediate caller. The core never logs-and-swallows one of these;
//! the only failures it suppresses are subscriber callback failures during
//! notification fan-out (see [`crate::notify`]).

use rendezvous_types::{EventId, EventType, ParticipantId};

/// Errors that can occur during registry and event operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No event is registered under the given id.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// No participant is registered under the given id.
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// An event with the same id is already registered.
    #[error("event {id} already exists ('{existing_name}')")]
    EventAlreadyExists {
        /// The contested id.
        id: EventId,
        /// Name of the event already holding the id.
        existing_name: String,
    },

    /// A participant with the same id is already registered.
    #[error("participant {id} already exists ('{existing_name}')")]
    ParticipantAlreadyExists {
        /// The contested id.
        id: ParticipantId,
        /// Name of the participant already holding the id.
        existing_name: String,
    },

    /// The event is full.
    #[error("event '{event_name}' is full ({current}/{max})")]
    CapacityExceeded {
        /// The full event.
        event: EventId,
        /// Its display name.
        event_name: String,
        /// Maximum capacity.
        max: u32,
        /// Current number of enrolled participants.
        current: u32,
    },

    /// The participant is already enrolled in the event.
    #[error("participant {participant} is already enrolled in event {event}")]
    AlreadyEnrolled {
        /// The event.
        event: EventId,
        /// The participant.
        participant: ParticipantId,
    },

    /// The event is cancelled; its membership is frozen.
    #[error("event '{event_name}' ({event}) is cancelled")]
    EventCancelled {
        /// The cancelled event.
        event: EventId,
        /// Its display name.
        event_name: String,
    },

    /// Capacity must be strictly positive.
    #[error("capacity must be greater than zero, got {capacity}")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: u32,
    },

    /// The operation only applies to another event variant.
    #[error("event {event} is not a {expected}")]
    WrongEventType {
        /// The event addressed.
        event: EventId,
        /// The variant the operation requires.
        expected: EventType,
    },

    /// The participant is not an organizer.
    #[error("participant {0} is not an organizer")]
    NotAnOrganizer(ParticipantId),
}

impl RegistryError {
    /// Machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::ParticipantNotFound(_) => "PARTICIPANT_NOT_FOUND",
            Self::EventAlreadyExists { .. } => "EVENT_EXISTS",
            Self::ParticipantAlreadyExists { .. } => "PARTICIPANT_EXISTS",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::AlreadyEnrolled { .. } => "ALREADY_ENROLLED",
            Self::EventCancelled { .. } => "EVENT_CANCELLED",
            Self::InvalidCapacity { .. } => "INVALID_CAPACITY",
            Self::WrongEventType { .. } => "WRONG_EVENT_TYPE",
            Self::NotAnOrganizer(_) => "NOT_AN_ORGANIZER",
        }
    }

    /// Message suitable for showing to an operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::EventNotFound(id) => format!("No event found with id '{id}'"),
            Self::ParticipantNotFound(id) => format!("No participant found with id '{id}'"),
            Self::EventAlreadyExists { id, existing_name } => {
                format!("The id '{id}' is already used by event '{existing_name}'")
            }
            Self::ParticipantAlreadyExists { id, existing_name } => {
                format!("The id '{id}' is already used by participant '{existing_name}'")
            }
            Self::CapacityExceeded {
                event_name,
                max,
                current,
                ..
            } => format!("Event '{event_name}' is full ({current}/{max} seats taken)"),
            other => format!("[{}] {other}", other.code()),
        }
    }

    /// Seats still free when the error was raised, for capacity errors.
    pub const fn remaining_seats(&self) -> Option<u32> {
        match self {
            Self::CapacityExceeded { max, current, .. } => Some(max.saturating_sub(*current)),
            _ => None,
        }
    }
}
