//! Events: the enrollment state machine and its notification protocol.
//!
//! An [`Event`] owns its roster of enrolled participants and, coupled to
//! that roster, its list of subscribers. Both live behind one lock so they
//! can never drift apart:
//!
//! ```text
//! enroll(p)    roster += p, subscribers += p, notify Modified
//! withdraw(p)  roster -= p, subscribers -= p, notify Modified
//! rename/...   field changed?            -> notify InfoChanged
//! cancel()     cancelled = true          -> notify Cancelled (always)
//! ```
//!
//! # Concurrency
//!
//! The subscriber list is copy-on-write: every mutation swaps in a new
//! `Arc<Vec<_>>`. A notification captures the current `Arc` while the lock
//! is held and is delivered after the lock is released, so a concurrent
//! enroll or withdraw never tears the list being iterated and callbacks may
//! read the event freely.

use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use rendezvous_types::{EventId, EventType, NotificationKind, ParticipantId, Speaker};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::notify::{self, Delivery, Subscriber};
use crate::participant::Participant;

/// Date format used in notification messages.
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

// ---------------------------------------------------------------------------
// Construction parameters and variant details
// ---------------------------------------------------------------------------

/// Fields shared by every event variant.
///
/// Packs the constructor arguments into a single struct to keep call sites
/// readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParams {
    /// Unique, immutable id.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Scheduled start.
    pub date: NaiveDateTime,
    /// Venue.
    pub location: String,
    /// Maximum number of enrolled participants (must be > 0).
    pub capacity: u32,
}

impl EventParams {
    /// Bundle the common event fields.
    pub fn new(
        id: impl Into<EventId>,
        name: impl Into<String>,
        date: NaiveDateTime,
        location: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            date,
            location: location.into(),
            capacity,
        }
    }
}

/// Variant-specific event data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDetails {
    /// A talk.
    Talk {
        /// Subject of the talk.
        theme: String,
        /// Speakers in presentation order.
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

impl EventDetails {
    /// The variant tag.
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Talk { .. } => EventType::Talk,
            Self::Concert { .. } => EventType::Concert,
        }
    }
}

/// A consistent, lock-free copy of an event's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventView {
    /// Event id.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Scheduled start.
    pub date: NaiveDateTime,
    /// Venue.
    pub location: String,
    /// Maximum capacity.
    pub capacity: u32,
    /// Whether the event is cancelled.
    pub cancelled: bool,
    /// Enrolled participant ids, in enrollment order.
    pub enrolled: Vec<ParticipantId>,
    /// Number of subscribers (members plus non-member observers).
    pub subscriber_count: usize,
    /// Variant data.
    pub details: EventDetails,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// A notification captured under the lock, sent after it is released.
struct Pending {
    subscribers: Arc<Vec<Arc<dyn Subscriber>>>,
    kind: NotificationKind,
    event_name: String,
    message: String,
}

impl Pending {
    fn send(self) -> Delivery {
        notify::fan_out(&self.subscribers, self.kind, &self.event_name, &self.message)
    }
}

struct EventState {
    name: String,
    date: NaiveDateTime,
    location: String,
    capacity: u32,
    cancelled: bool,
    enrolled: Vec<Arc<Participant>>,
    subscribers: Arc<Vec<Arc<dyn Subscriber>>>,
    details: EventDetails,
}

impl EventState {
    fn enrolled_count(&self) -> u32 {
        u32::try_from(self.enrolled.len()).unwrap_or(u32::MAX)
    }

    fn is_enrolled(&self, id: &ParticipantId) -> bool {
        self.enrolled.iter().any(|p| p.id() == id)
    }

    fn has_subscriber(&self, key: &str) -> bool {
        self.subscribers.iter().any(|s| s.subscriber_key() == key)
    }

    /// Copy-on-write append. Re-adding an existing key is a no-op.
    fn add_subscriber(&mut self, subscriber: Arc<dyn Subscriber>) -> bool {
        if self.has_subscriber(subscriber.subscriber_key()) {
            return false;
        }
        let mut next = Vec::with_capacity(self.subscribers.len().saturating_add(1));
        next.extend(self.subscribers.iter().cloned());
        next.push(subscriber);
        self.subscribers = Arc::new(next);
        true
    }

    /// Copy-on-write insert that always leaves `subscriber` registered.
    ///
    /// An observer holding the same key is replaced in place. Returns the
    /// entry it displaced, if any.
    fn put_subscriber(&mut self, subscriber: Arc<dyn Subscriber>) -> Option<Arc<dyn Subscriber>> {
        let key = subscriber.subscriber_key().to_owned();
        let Some(position) = self.subscribers.iter().position(|s| s.subscriber_key() == key) else {
            self.add_subscriber(subscriber);
            return None;
        };
        let mut next: Vec<Arc<dyn Subscriber>> = self.subscribers.iter().cloned().collect();
        let displaced = next.get_mut(position).map(|slot| std::mem::replace(slot, subscriber));
        self.subscribers = Arc::new(next);
        displaced
    }

    /// Copy-on-write removal.
    fn remove_subscriber(&mut self, key: &str) -> bool {
        if !self.has_subscriber(key) {
            return false;
        }
        let next: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .iter()
            .filter(|s| s.subscriber_key() != key)
            .cloned()
            .collect();
        self.subscribers = Arc::new(next);
        true
    }

    fn pending(&self, kind: NotificationKind, message: String) -> Pending {
        Pending {
            subscribers: Arc::clone(&self.subscribers),
            kind,
            event_name: self.name.clone(),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A talk or a concert, with its roster and subscribers.
///
/// Equality is by id.
pub struct Event {
    id: EventId,
    state: RwLock<EventState>,
}

impl Event {
    /// Create an event with an empty roster.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidCapacity`] if the capacity is zero.
    pub fn new(params: EventParams, details: EventDetails) -> Result<Self, RegistryError> {
        if params.capacity == 0 {
            return Err(RegistryError::InvalidCapacity { capacity: 0 });
        }
        Ok(Self {
            id: params.id,
            state: RwLock::new(EventState {
                name: params.name,
                date: params.date,
                location: params.location,
                capacity: params.capacity,
                cancelled: false,
                enrolled: Vec::new(),
                subscribers: Arc::new(Vec::new()),
                details,
            }),
        })
    }

    /// Create a talk with no speakers.
    pub fn talk(params: EventParams, theme: impl Into<String>) -> Result<Self, RegistryError> {
        Self::new(
            params,
            EventDetails::Talk {
                theme: theme.into(),
                speakers: Vec::new(),
            },
        )
    }

    /// Create a concert.
    pub fn concert(
        params: EventParams,
        artist: impl Into<String>,
        genre: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        Self::new(
            params,
            EventDetails::Concert {
                artist: artist.into(),
                genre: genre.into(),
            },
        )
    }

    /// Rebuild an event from persisted data.
    ///
    /// The roster is restored as given (duplicates dropped) but **no
    /// subscribers are registered**: subscriptions are derived state and
    /// must be rebuilt with [`reconstruct_subscriptions`] once every event
    /// is restored.
    ///
    /// [`reconstruct_subscriptions`]: Event::reconstruct_subscriptions
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidCapacity`] for a zero capacity and
    /// [`RegistryError::CapacityExceeded`] if the roster does not fit.
    pub fn restore(
        params: EventParams,
        details: EventDetails,
        cancelled: bool,
        enrolled: Vec<Arc<Participant>>,
    ) -> Result<Self, RegistryError> {
        let event = Self::new(params, details)?;
        {
            let mut state = event.state.write();
            for participant in enrolled {
                if !state.is_enrolled(participant.id()) {
                    state.enrolled.push(participant);
                }
            }
            if state.enrolled_count() > state.capacity {
                return Err(RegistryError::CapacityExceeded {
                    event: event.id.clone(),
                    event_name: state.name.clone(),
                    max: state.capacity,
                    current: state.enrolled_count(),
                });
            }
            state.cancelled = cancelled;
        }
        Ok(event)
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Enroll a participant and subscribe it to this event.
    ///
    /// Every subscriber, the newcomer included, receives a modification
    /// notification with the new head count.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::EventCancelled`] if the event is cancelled.
    /// - [`RegistryError::CapacityExceeded`] if the event is full.
    /// - [`RegistryError::AlreadyEnrolled`] if the participant is a member.
    ///
    /// State is unchanged on error.
    pub fn enroll(&self, participant: Arc<Participant>) -> Result<Delivery, RegistryError> {
        let pending = {
            let mut state = self.state.write();
            if state.cancelled {
                return Err(RegistryError::EventCancelled {
                    event: self.id.clone(),
                    event_name: state.name.clone(),
                });
            }
            if state.enrolled_count() >= state.capacity {
                return Err(RegistryError::CapacityExceeded {
                    event: self.id.clone(),
                    event_name: state.name.clone(),
                    max: state.capacity,
                    current: state.enrolled_count(),
                });
            }
            if state.is_enrolled(participant.id()) {
                return Err(RegistryError::AlreadyEnrolled {
                    event: self.id.clone(),
                    participant: participant.id().clone(),
                });
            }

            state.enrolled.push(Arc::clone(&participant));
            let subscriber: Arc<dyn Subscriber> = Arc::clone(&participant) as Arc<dyn Subscriber>;
            if state.put_subscriber(subscriber).is_some() {
                warn!(
                    event_id = %self.id,
                    participant_id = %participant.id(),
                    "Observer with the same key replaced by the enrolled participant"
                );
            }

            info!(
                event_id = %self.id,
                participant_id = %participant.id(),
                enrolled = state.enrolled.len(),
                capacity = state.capacity,
                "Participant enrolled and subscribed"
            );

            let message = format!(
                "New participant: {} ({}/{} seats)",
                participant.name(),
                state.enrolled_count(),
                state.capacity
            );
            state.pending(NotificationKind::Modified, message)
        };
        Ok(pending.send())
    }

    /// Withdraw a participant and unsubscribe it.
    ///
    /// Remaining subscribers receive a modification notification. Returns
    /// `Ok(false)` when the participant was not enrolled.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EventCancelled`] if the event is cancelled:
    /// a cancelled event's membership is frozen until [`reinstate`].
    ///
    /// [`reinstate`]: Event::reinstate
    pub fn withdraw(&self, participant: &ParticipantId) -> Result<bool, RegistryError> {
        let pending = {
            let mut state = self.state.write();
            if state.cancelled {
                return Err(RegistryError::EventCancelled {
                    event: self.id.clone(),
                    event_name: state.name.clone(),
                });
            }
            let Some(position) = state.enrolled.iter().position(|p| p.id() == participant) else {
                return Ok(false);
            };
            let removed = state.enrolled.remove(position);
            state.remove_subscriber(removed.subscriber_key());

            info!(
                event_id = %self.id,
                participant_id = %participant,
                enrolled = state.enrolled.len(),
                "Participant withdrawn and unsubscribed"
            );

            let message = format!(
                "Participant left: {} ({}/{} seats)",
                removed.name(),
                state.enrolled_count(),
                state.capacity
            );
            state.pending(NotificationKind::Modified, message)
        };
        pending.send();
        Ok(true)
    }

    /// Subscribe a non-member observer. Returns `Ok(false)` if its key is
    /// already subscribed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EventCancelled`] if the event is cancelled.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> Result<bool, RegistryError> {
        let mut state = self.state.write();
        if state.cancelled {
            return Err(RegistryError::EventCancelled {
                event: self.id.clone(),
                event_name: state.name.clone(),
            });
        }
        Ok(state.add_subscriber(subscriber))
    }

    /// Remove a subscriber by key. Membership is untouched.
    pub fn unsubscribe(&self, key: &str) -> bool {
        self.state.write().remove_subscriber(key)
    }

    /// Rebuild the subscriber list from the roster.
    ///
    /// Clears every subscriber (non-member observers included) and
    /// re-subscribes each enrolled participant in roster order. This is the
    /// mandatory step after a bulk load, and works on cancelled events too.
    /// Returns the number of subscribers registered.
    pub fn reconstruct_subscriptions(&self) -> usize {
        let mut state = self.state.write();
        let rebuilt: Vec<Arc<dyn Subscriber>> = state
            .enrolled
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn Subscriber>)
            .collect();
        let count = rebuilt.len();
        state.subscribers = Arc::new(rebuilt);
        count
    }

    // -----------------------------------------------------------------------
    // Field changes
    // -----------------------------------------------------------------------

    /// Rename the event. Returns whether the name changed.
    pub fn rename(&self, new_name: impl Into<String>) -> bool {
        let new_name = new_name.into();
        let pending = {
            let mut state = self.state.write();
            if state.name == new_name {
                return false;
            }
            let old = std::mem::replace(&mut state.name, new_name);
            let message = format!("Name changed: '{old}' -> '{}'", state.name);
            state.pending(NotificationKind::InfoChanged, message)
        };
        pending.send();
        true
    }

    /// Move the event to another venue. Returns whether it changed.
    pub fn relocate(&self, new_location: impl Into<String>) -> bool {
        let new_location = new_location.into();
        let pending = {
            let mut state = self.state.write();
            if state.location == new_location {
                return false;
            }
            let old = std::mem::replace(&mut state.location, new_location);
            let message = format!("Location changed: '{old}' -> '{}'", state.location);
            state.pending(NotificationKind::InfoChanged, message)
        };
        pending.send();
        true
    }

    /// Move the event to another date. Returns whether it changed.
    pub fn reschedule(&self, new_date: NaiveDateTime) -> bool {
        let pending = {
            let mut state = self.state.write();
            if state.date == new_date {
                return false;
            }
            let old = std::mem::replace(&mut state.date, new_date);
            let message = format!(
                "Date changed: {} -> {}",
                old.format(DISPLAY_DATE_FORMAT),
                new_date.format(DISPLAY_DATE_FORMAT)
            );
            state.pending(NotificationKind::InfoChanged, message)
        };
        pending.send();
        true
    }

    /// Change the capacity. Returns whether it changed.
    ///
    /// Shrinking below the current head count evicts nobody; it only
    /// blocks further enrollment until members withdraw.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidCapacity`] for zero.
    pub fn resize(&self, new_capacity: u32) -> Result<bool, RegistryError> {
        if new_capacity == 0 {
            return Err(RegistryError::InvalidCapacity { capacity: 0 });
        }
        let pending = {
            let mut state = self.state.write();
            if state.capacity == new_capacity {
                return Ok(false);
            }
            let old = std::mem::replace(&mut state.capacity, new_capacity);
            let message = format!("Capacity changed: {old} -> {new_capacity} seats");
            state.pending(NotificationKind::InfoChanged, message)
        };
        pending.send();
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Cancel the event and notify every subscriber.
    ///
    /// Cancelling twice is not an error: the flag stays set and a second
    /// cancellation notice goes out.
    pub fn cancel(&self) -> Delivery {
        let pending = {
            let mut state = self.state.write();
            state.cancelled = true;
            let message = format!(
                "The event '{}' scheduled on {} at {} in {} has been cancelled. \
                 We apologise for the inconvenience.",
                state.name,
                state.date.format("%d/%m/%Y"),
                state.date.format("%H:%M"),
                state.location
            );
            info!(
                event_id = %self.id,
                subscribers = state.subscribers.len(),
                "Event cancelled"
            );
            state.pending(NotificationKind::Cancelled, message)
        };
        pending.send()
    }

    /// Lift a cancellation. Returns `false` if the event was not cancelled.
    pub fn reinstate(&self) -> bool {
        let pending = {
            let mut state = self.state.write();
            if !state.cancelled {
                return false;
            }
            state.cancelled = false;
            info!(event_id = %self.id, "Event reinstated");
            let message = format!("Event '{}' is scheduled again", state.name);
            state.pending(NotificationKind::InfoChanged, message)
        };
        pending.send();
        true
    }

    // -----------------------------------------------------------------------
    // Variant operations
    // -----------------------------------------------------------------------

    /// Add a speaker to a talk. Returns `Ok(false)` if already listed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::WrongEventType`] for concerts.
    pub fn add_speaker(&self, speaker: Speaker) -> Result<bool, RegistryError> {
        let mut state = self.state.write();
        let EventDetails::Talk { speakers, .. } = &mut state.details else {
            return Err(self.not_a(EventType::Talk));
        };
        if speakers.contains(&speaker) {
            return Ok(false);
        }
        speakers.push(speaker);
        Ok(true)
    }

    /// Remove a speaker from a talk. Returns whether it was listed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::WrongEventType`] for concerts.
    pub fn remove_speaker(&self, speaker: &Speaker) -> Result<bool, RegistryError> {
        let mut state = self.state.write();
        let EventDetails::Talk { speakers, .. } = &mut state.details else {
            return Err(self.not_a(EventType::Talk));
        };
        let before = speakers.len();
        speakers.retain(|s| s != speaker);
        Ok(speakers.len() != before)
    }

    /// Speakers of a talk, in order. Empty for concerts.
    pub fn speakers(&self) -> Vec<Speaker> {
        match &self.state.read().details {
            EventDetails::Talk { speakers, .. } => speakers.clone(),
            EventDetails::Concert { .. } => Vec::new(),
        }
    }

    /// Theme of a talk.
    pub fn theme(&self) -> Option<String> {
        match &self.state.read().details {
            EventDetails::Talk { theme, .. } => Some(theme.clone()),
            EventDetails::Concert { .. } => None,
        }
    }

    /// Artist of a concert.
    pub fn artist(&self) -> Option<String> {
        match &self.state.read().details {
            EventDetails::Concert { artist, .. } => Some(artist.clone()),
            EventDetails::Talk { .. } => None,
        }
    }

    /// Genre of a concert.
    pub fn genre(&self) -> Option<String> {
        match &self.state.read().details {
            EventDetails::Concert { genre, .. } => Some(genre.clone()),
            EventDetails::Talk { .. } => None,
        }
    }

    /// Whether a concert's genre contains the needle (case-insensitive).
    pub fn is_genre(&self, needle: &str) -> bool {
        self.genre()
            .is_some_and(|g| g.to_lowercase().contains(&needle.to_lowercase()))
    }

    fn not_a(&self, expected: EventType) -> RegistryError {
        RegistryError::WrongEventType {
            event: self.id.clone(),
            expected,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The event's id.
    pub const fn id(&self) -> &EventId {
        &self.id
    }

    /// Current display name.
    pub fn name(&self) -> String {
        self.state.read().name.clone()
    }

    /// Scheduled start.
    pub fn date(&self) -> NaiveDateTime {
        self.state.read().date
    }

    /// Current venue.
    pub fn location(&self) -> String {
        self.state.read().location.clone()
    }

    /// Maximum capacity.
    pub fn capacity(&self) -> u32 {
        self.state.read().capacity
    }

    /// Whether the event is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.read().cancelled
    }

    /// The variant tag.
    pub fn event_type(&self) -> EventType {
        self.state.read().details.event_type()
    }

    /// A copy of the variant data.
    pub fn details(&self) -> EventDetails {
        self.state.read().details.clone()
    }

    /// Enrolled participants, in enrollment order.
    pub fn enrolled(&self) -> Vec<Arc<Participant>> {
        self.state.read().enrolled.clone()
    }

    /// Number of enrolled participants.
    pub fn enrolled_count(&self) -> u32 {
        self.state.read().enrolled_count()
    }

    /// Seats left; zero when full or shrunk below the head count.
    pub fn available_seats(&self) -> u32 {
        let state = self.state.read();
        state.capacity.saturating_sub(state.enrolled_count())
    }

    /// Whether no further enrollment fits.
    pub fn is_full(&self) -> bool {
        self.available_seats() == 0
    }

    /// Whether the participant is enrolled.
    pub fn is_enrolled(&self, participant: &ParticipantId) -> bool {
        self.state.read().is_enrolled(participant)
    }

    /// Number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.read().subscribers.len()
    }

    /// Subscriber keys, in delivery order.
    pub fn subscriber_keys(&self) -> Vec<String> {
        self.state
            .read()
            .subscribers
            .iter()
            .map(|s| s.subscriber_key().to_owned())
            .collect()
    }

    /// Occupancy as a percentage of capacity, rounded to two decimals.
    pub fn occupancy_pct(&self) -> Decimal {
        let state = self.state.read();
        Decimal::from(state.enrolled_count())
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|v| v.checked_div(Decimal::from(state.capacity)))
            .map_or(Decimal::ZERO, |v| v.round_dp(2))
    }

    /// A consistent copy of the whole state, taken under one lock.
    pub fn view(&self) -> EventView {
        let state = self.state.read();
        EventView {
            id: self.id.clone(),
            name: state.name.clone(),
            date: state.date,
            location: state.location.clone(),
            capacity: state.capacity,
            cancelled: state.cancelled,
            enrolled: state.enrolled.iter().map(|p| p.id().clone()).collect(),
            subscriber_count: state.subscribers.len(),
            details: state.details.clone(),
        }
    }

    /// One-line description for listings and logs.
    pub fn summary(&self) -> String {
        let state = self.state.read();
        format!(
            "{}{{id='{}', name='{}', date={}, location='{}', participants={}/{}, subscribers={}, status={}}}",
            state.details.event_type(),
            self.id,
            state.name,
            state.date.format(DISPLAY_DATE_FORMAT),
            state.location,
            state.enrolled.len(),
            state.capacity,
            state.subscribers.len(),
            if state.cancelled { "CANCELLED" } else { "ACTIVE" }
        )
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("name", &state.name)
            .field("type", &state.details.event_type())
            .field("enrolled", &state.enrolled.len())
            .field("capacity", &state.capacity)
            .field("subscribers", &state.subscribers.len())
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::notify::testing::{Broken, Recorder};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 11, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap_or_default()
    }

    fn talk(id: &str, capacity: u32) -> Event {
        Event::talk(
            EventParams::new(id, "X", at(20, 18), "Room A", capacity),
            "Ownership",
        )
        .unwrap()
    }

    fn person(id: &str) -> Arc<Participant> {
        Arc::new(Participant::new(id, id, format!("{id}@example.com")))
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = Event::concert(EventParams::new("C0", "n", at(1, 1), "l", 0), "a", "g");
        assert!(matches!(result, Err(RegistryError::InvalidCapacity { .. })));
    }

    #[test]
    fn enrollment_fills_to_capacity_then_fails() {
        let t1 = talk("T1", 2);
        let (a, b, c) = (person("A"), person("B"), person("C"));

        assert!(t1.enroll(a).is_ok());
        assert!(t1.enroll(b).is_ok());
        assert_eq!(t1.enrolled_count(), 2);
        assert_eq!(t1.subscriber_count(), 2);

        let err = t1.enroll(c);
        assert!(matches!(
            err,
            Err(RegistryError::CapacityExceeded { max: 2, current: 2, .. })
        ));
        assert_eq!(t1.enrolled_count(), 2);
        assert_eq!(t1.subscriber_count(), 2);
    }

    #[test]
    fn enrollment_notifies_everyone_including_newcomer() {
        let t1 = talk("T1", 5);
        let (a, b) = (person("A"), person("B"));
        let _ = t1.enroll(Arc::clone(&a));
        let delivery = t1.enroll(Arc::clone(&b));

        assert_eq!(delivery.map(|d| d.delivered).ok(), Some(2));
        assert_eq!(a.inbox_len(), 2);
        assert_eq!(b.inbox_len(), 1);
        assert!(b
            .inbox()
            .first()
            .is_some_and(|n| n.message.contains("(2/5 seats)")));
    }

    #[test]
    fn duplicate_enrollment_fails() {
        let t1 = talk("T1", 5);
        let a = person("A");
        let _ = t1.enroll(Arc::clone(&a));
        assert!(matches!(
            t1.enroll(a),
            Err(RegistryError::AlreadyEnrolled { .. })
        ));
        assert_eq!(t1.enrolled_count(), 1);
    }

    #[test]
    fn withdraw_removes_from_roster_and_subscribers() {
        let t1 = talk("T1", 5);
        let (a, b) = (person("A"), person("B"));
        let _ = t1.enroll(Arc::clone(&a));
        let _ = t1.enroll(Arc::clone(&b));
        a.clear_inbox();

        assert_eq!(t1.withdraw(b.id()).ok(), Some(true));
        assert!(!t1.is_enrolled(b.id()));
        assert_eq!(t1.subscriber_keys(), vec!["A".to_owned()]);
        assert_eq!(a.inbox_len(), 1);

        assert_eq!(t1.withdraw(b.id()).ok(), Some(false));
    }

    #[test]
    fn cancel_notifies_each_member_once() {
        let t1 = talk("T1", 5);
        let members: Vec<_> = ["A", "B", "C"].iter().map(|id| person(id)).collect();
        for m in &members {
            let _ = t1.enroll(Arc::clone(m));
        }
        for m in &members {
            m.clear_inbox();
        }

        let delivery = t1.cancel();

        assert_eq!(delivery.delivered, 3);
        for m in &members {
            let inbox = m.inbox();
            assert_eq!(inbox.len(), 1);
            assert_eq!(inbox.first().map(|n| n.kind), Some(NotificationKind::Cancelled));
            assert!(inbox
                .first()
                .is_some_and(|n| n.message.contains("20/11/2026") && n.message.contains("Room A")));
        }
    }

    #[test]
    fn cancel_twice_fans_out_twice_and_freezes_membership() {
        let t1 = talk("T1", 5);
        let a = person("A");
        let _ = t1.enroll(Arc::clone(&a));
        a.clear_inbox();

        t1.cancel();
        t1.cancel();

        assert!(t1.is_cancelled());
        assert_eq!(t1.enrolled_count(), 1);
        assert_eq!(a.inbox_len(), 2);
        assert!(matches!(
            t1.enroll(person("B")),
            Err(RegistryError::EventCancelled { .. })
        ));
        assert!(matches!(
            t1.withdraw(a.id()),
            Err(RegistryError::EventCancelled { .. })
        ));
    }

    #[test]
    fn reinstate_reopens_enrollment() {
        let t1 = talk("T1", 5);
        assert!(!t1.reinstate());
        t1.cancel();
        assert!(t1.reinstate());
        assert!(!t1.is_cancelled());
        assert!(t1.enroll(person("A")).is_ok());
    }

    #[test]
    fn rename_to_same_value_is_silent() {
        let t1 = talk("T1", 5);
        let recorder = Arc::new(Recorder::new("audit"));
        assert_eq!(t1.subscribe(recorder.clone()).ok(), Some(true));

        assert!(!t1.rename("X"));
        assert_eq!(recorder.count(NotificationKind::InfoChanged), 0);

        assert!(t1.rename("Y"));
        assert_eq!(recorder.count(NotificationKind::InfoChanged), 1);
        let received = recorder.received.lock();
        let (_, name, message) = received.first().cloned().unwrap();
        assert_eq!(name, "Y");
        assert!(message.contains("'X'") && message.contains("'Y'"));
    }

    #[test]
    fn field_changes_fire_only_when_different() {
        let t1 = talk("T1", 5);
        let recorder = Arc::new(Recorder::new("audit"));
        let _ = t1.subscribe(recorder.clone());

        assert!(!t1.relocate("Room A"));
        assert!(t1.relocate("Room B"));
        assert!(!t1.reschedule(at(20, 18)));
        assert!(t1.reschedule(at(21, 18)));
        assert_eq!(t1.resize(5).ok(), Some(false));
        assert_eq!(t1.resize(8).ok(), Some(true));

        assert_eq!(recorder.count(NotificationKind::InfoChanged), 3);
        assert!(matches!(
            t1.resize(0),
            Err(RegistryError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn shrinking_keeps_members_but_blocks_enrollment() {
        let t1 = talk("T1", 3);
        for id in ["A", "B", "C"] {
            let _ = t1.enroll(person(id));
        }

        assert_eq!(t1.resize(1).ok(), Some(true));
        assert_eq!(t1.enrolled_count(), 3);
        assert_eq!(t1.available_seats(), 0);
        assert!(matches!(
            t1.enroll(person("D")),
            Err(RegistryError::CapacityExceeded { max: 1, current: 3, .. })
        ));
    }

    #[test]
    fn broken_subscriber_does_not_abort_mutation() {
        let t1 = talk("T1", 5);
        let _ = t1.subscribe(Arc::new(Broken("broken".to_owned())));
        let a = person("A");

        let delivery = t1.enroll(Arc::clone(&a));

        assert_eq!(delivery.map(|d| (d.delivered, d.failed)).ok(), Some((1, 1)));
        assert!(t1.is_enrolled(a.id()));
        assert_eq!(a.inbox_len(), 1);
    }

    #[test]
    fn subscribe_without_enrolling_and_unsubscribe() {
        let t1 = talk("T1", 5);
        let recorder = Arc::new(Recorder::new("audit"));
        assert_eq!(t1.subscribe(recorder.clone()).ok(), Some(true));
        assert_eq!(t1.subscribe(recorder).ok(), Some(false));
        assert_eq!(t1.enrolled_count(), 0);
        assert_eq!(t1.subscriber_count(), 1);

        assert!(t1.unsubscribe("audit"));
        assert!(!t1.unsubscribe("audit"));
        t1.cancel();
        assert!(matches!(
            t1.subscribe(Arc::new(Recorder::new("late"))),
            Err(RegistryError::EventCancelled { .. })
        ));
    }

    #[test]
    fn member_takes_over_an_observer_key() {
        let t1 = talk("T1", 5);
        let impostor = Arc::new(Recorder::new("A"));
        assert_eq!(t1.subscribe(impostor.clone()).ok(), Some(true));
        let a = person("A");

        t1.enroll(Arc::clone(&a)).unwrap();

        assert_eq!(t1.subscriber_keys(), vec!["A".to_owned()]);
        a.clear_inbox();
        let delivery = t1.cancel();
        assert_eq!(delivery.delivered, 1);
        assert_eq!(a.inbox().first().map(|n| n.kind), Some(NotificationKind::Cancelled));
        assert_eq!(impostor.count(NotificationKind::Cancelled), 0);
    }

    #[test]
    fn observer_cannot_displace_a_member() {
        let t1 = talk("T1", 5);
        let a = person("A");
        t1.enroll(Arc::clone(&a)).unwrap();

        assert_eq!(t1.subscribe(Arc::new(Recorder::new("A"))).ok(), Some(false));
        assert!(t1.withdraw(a.id()).unwrap());
        assert_eq!(t1.subscriber_count(), 0);
    }

    #[test]
    fn restore_then_reconstruct_derives_subscribers() {
        let (a, b) = (person("A"), person("B"));
        let event = Event::restore(
            EventParams::new("C1", "Gig", at(5, 21), "Hall", 4),
            EventDetails::Concert {
                artist: "Band".to_owned(),
                genre: "Jazz".to_owned(),
            },
            false,
            vec![Arc::clone(&a), Arc::clone(&b), Arc::clone(&a)],
        )
        .unwrap();

        assert_eq!(event.enrolled_count(), 2);
        assert_eq!(event.subscriber_count(), 0);
        assert_eq!(event.reconstruct_subscriptions(), 2);
        assert_eq!(event.subscriber_keys(), vec!["A".to_owned(), "B".to_owned()]);
    }

    #[test]
    fn restore_rejects_overfull_roster() {
        let result = Event::restore(
            EventParams::new("C1", "Gig", at(5, 21), "Hall", 1),
            EventDetails::Concert {
                artist: String::new(),
                genre: String::new(),
            },
            false,
            vec![person("A"), person("B")],
        );
        assert!(matches!(
            result,
            Err(RegistryError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn speakers_only_on_talks() {
        let t1 = talk("T1", 5);
        let ada = Speaker::new("Ada", "Compilers");
        assert_eq!(t1.add_speaker(ada.clone()).ok(), Some(true));
        assert_eq!(t1.add_speaker(ada.clone()).ok(), Some(false));
        assert_eq!(t1.speakers().len(), 1);
        assert_eq!(t1.remove_speaker(&ada).ok(), Some(true));

        let gig = Event::concert(
            EventParams::new("C1", "Gig", at(1, 20), "Hall", 10),
            "Nina",
            "Jazz Soul",
        )
        .unwrap();
        assert!(matches!(
            gig.add_speaker(ada),
            Err(RegistryError::WrongEventType { .. })
        ));
        assert!(gig.is_genre("jazz"));
        assert!(!gig.is_genre("rock"));
        assert_eq!(gig.theme(), None);
    }

    #[test]
    fn occupancy_is_exact() {
        let t1 = talk("T1", 3);
        let _ = t1.enroll(person("A"));
        assert_eq!(t1.occupancy_pct(), Decimal::new(3333, 2));
        assert!(t1.summary().contains("participants=1/3"));
    }
}
