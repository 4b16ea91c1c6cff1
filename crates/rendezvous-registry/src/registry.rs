//! The registry: single owner of every event and participant.
//!
//! [`EventRegistry`] resolves ids to entities and delegates the actual state
//! changes to [`Event`]. It is an explicitly constructed value, usually
//! shared as `Arc<EventRegistry>`; tests build their own.
//!
//! # Locking
//!
//! Each catalog sits behind its own `RwLock`. Lookups clone the `Arc` out
//! and release the lock before touching the entity, so no registry lock is
//! ever held while notifications fan out. When both catalogs are locked
//! together, events are always locked before participants.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use rendezvous_types::{EventId, EventType, ParticipantId};
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::event::Event;
use crate::notify::Delivery;
use crate::participant::Participant;
use crate::stats::RegistryStats;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// An id-indexed collection that remembers insertion order.
struct Catalog<K, V> {
    order: Vec<Arc<V>>,
    by_id: HashMap<K, Arc<V>>,
}

impl<K: Eq + Hash + Clone, V> Catalog<K, V> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    fn get(&self, id: &K) -> Option<Arc<V>> {
        self.by_id.get(id).cloned()
    }

    fn insert(&mut self, id: K, value: Arc<V>) {
        self.order.push(Arc::clone(&value));
        self.by_id.insert(id, value);
    }

    fn remove(&mut self, id: &K) -> Option<Arc<V>> {
        let removed = self.by_id.remove(id)?;
        self.order.retain(|v| !Arc::ptr_eq(v, &removed));
        Some(removed)
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn values(&self) -> Vec<Arc<V>> {
        self.order.clone()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.by_id.clear();
    }
}

/// Field changes for [`EventRegistry::modify_event`]. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventChanges {
    /// New display name.
    pub name: Option<String>,
    /// New date.
    pub date: Option<NaiveDateTime>,
    /// New venue.
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// EventRegistry
// ---------------------------------------------------------------------------

/// Owner of all events and participants.
pub struct EventRegistry {
    events: RwLock<Catalog<EventId, Event>>,
    participants: RwLock<Catalog<ParticipantId, Participant>>,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("events", &self.event_count())
            .field("participants", &self.participant_count())
            .finish()
    }
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Catalog::new()),
            participants: RwLock::new(Catalog::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Register an event.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EventAlreadyExists`] if the id is taken.
    pub fn add_event(&self, event: impl Into<Arc<Event>>) -> Result<Arc<Event>, RegistryError> {
        let event = event.into();
        let mut events = self.events.write();
        if let Some(existing) = events.get(event.id()) {
            return Err(RegistryError::EventAlreadyExists {
                id: event.id().clone(),
                existing_name: existing.name(),
            });
        }
        events.insert(event.id().clone(), Arc::clone(&event));
        info!(
            event_id = %event.id(),
            event_type = event.event_type().label(),
            total = events.len(),
            "Event added"
        );
        Ok(event)
    }

    /// Remove an event, cancelling it first.
    ///
    /// The cancellation freezes the roster and notifies whoever is enrolled
    /// at that moment, so an enrollment racing with the removal either lands
    /// before it (and is notified) or fails with
    /// [`RegistryError::EventCancelled`]. Organizer back-references to the
    /// event are dropped too.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EventNotFound`] if absent.
    pub fn remove_event(&self, id: &EventId) -> Result<Arc<Event>, RegistryError> {
        let event = self.find_event(id)?;
        let delivery = event.cancel();
        if delivery.attempted() > 0 {
            info!(
                event_id = %id,
                notified = delivery.delivered,
                "Event cancelled before removal"
            );
        }

        let removed = self
            .events
            .write()
            .remove(id)
            .ok_or_else(|| RegistryError::EventNotFound(id.clone()))?;

        for participant in self.participants.read().order.iter() {
            participant.remove_organized_event(id);
        }
        info!(event_id = %id, "Event removed");
        Ok(removed)
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EventNotFound`] if absent.
    pub fn find_event(&self, id: &EventId) -> Result<Arc<Event>, RegistryError> {
        self.events
            .read()
            .get(id)
            .ok_or_else(|| RegistryError::EventNotFound(id.clone()))
    }

    /// All events, in insertion order.
    pub fn events(&self) -> Vec<Arc<Event>> {
        self.events.read().values()
    }

    /// Number of registered events.
    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// Register a participant.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ParticipantAlreadyExists`] if the id is taken.
    pub fn add_participant(
        &self,
        participant: impl Into<Arc<Participant>>,
    ) -> Result<Arc<Participant>, RegistryError> {
        let participant = participant.into();
        let mut participants = self.participants.write();
        if let Some(existing) = participants.get(participant.id()) {
            return Err(RegistryError::ParticipantAlreadyExists {
                id: participant.id().clone(),
                existing_name: existing.name().to_owned(),
            });
        }
        participants.insert(participant.id().clone(), Arc::clone(&participant));
        info!(
            participant_id = %participant.id(),
            role = %participant.role(),
            total = participants.len(),
            "Participant added"
        );
        Ok(participant)
    }

    /// Look up a participant.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ParticipantNotFound`] if absent.
    pub fn find_participant(&self, id: &ParticipantId) -> Result<Arc<Participant>, RegistryError> {
        self.participants
            .read()
            .get(id)
            .ok_or_else(|| RegistryError::ParticipantNotFound(id.clone()))
    }

    /// All participants, in insertion order.
    pub fn participants(&self) -> Vec<Arc<Participant>> {
        self.participants.read().values()
    }

    /// Number of registered participants.
    pub fn participant_count(&self) -> usize {
        self.participants.read().len()
    }

    // -----------------------------------------------------------------------
    // Cross-entity operations
    // -----------------------------------------------------------------------

    /// Enroll a participant in an event.
    ///
    /// # Errors
    ///
    /// Not-found errors for either id, then whatever [`Event::enroll`]
    /// returns.
    pub fn enroll_participant(
        &self,
        participant_id: &ParticipantId,
        event_id: &EventId,
    ) -> Result<Delivery, RegistryError> {
        let participant = self.find_participant(participant_id)?;
        let event = self.find_event(event_id)?;
        event.enroll(participant)
    }

    /// Withdraw a participant from an event. Returns whether it was enrolled.
    ///
    /// # Errors
    ///
    /// Not-found errors for either id, then whatever [`Event::withdraw`]
    /// returns.
    pub fn withdraw_participant(
        &self,
        participant_id: &ParticipantId,
        event_id: &EventId,
    ) -> Result<bool, RegistryError> {
        let participant = self.find_participant(participant_id)?;
        let event = self.find_event(event_id)?;
        event.withdraw(participant.id())
    }

    /// Apply the given field changes. Each changed field sends its own
    /// info-changed notification. Returns how many fields changed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EventNotFound`] if absent.
    pub fn modify_event(&self, id: &EventId, changes: EventChanges) -> Result<usize, RegistryError> {
        let event = self.find_event(id)?;
        let changed = [
            changes.name.is_some_and(|name| event.rename(name)),
            changes.date.is_some_and(|date| event.reschedule(date)),
            changes.location.is_some_and(|location| event.relocate(location)),
        ]
        .into_iter()
        .filter(|changed| *changed)
        .count();
        info!(event_id = %id, changed, "Event modified");
        Ok(changed)
    }

    /// Change an event's capacity. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Not-found, then whatever [`Event::resize`] returns.
    pub fn resize_event(&self, id: &EventId, capacity: u32) -> Result<bool, RegistryError> {
        self.find_event(id)?.resize(capacity)
    }

    /// Cancel an event without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EventNotFound`] if absent.
    pub fn cancel_event(&self, id: &EventId) -> Result<Delivery, RegistryError> {
        Ok(self.find_event(id)?.cancel())
    }

    /// Record that an organizer organizes an event. Returns `false` if it
    /// was already recorded.
    ///
    /// # Errors
    ///
    /// Not-found errors for either id, and
    /// [`RegistryError::NotAnOrganizer`] for standard participants.
    pub fn assign_organizer(
        &self,
        participant_id: &ParticipantId,
        event_id: &EventId,
    ) -> Result<bool, RegistryError> {
        let participant = self.find_participant(participant_id)?;
        let event = self.find_event(event_id)?;
        if !participant.is_organizer() {
            return Err(RegistryError::NotAnOrganizer(participant_id.clone()));
        }
        Ok(participant.add_organized_event(event.id().clone()))
    }

    // -----------------------------------------------------------------------
    // Bulk operations
    // -----------------------------------------------------------------------

    /// Drop every event and participant without any notification.
    pub fn clear_all(&self) {
        let mut events = self.events.write();
        let mut participants = self.participants.write();
        let (dropped_events, dropped_participants) = (events.len(), participants.len());
        events.clear();
        participants.clear();
        info!(
            events = dropped_events,
            participants = dropped_participants,
            "Registry cleared"
        );
    }

    /// Swap the whole registry contents for a loaded set, atomically.
    ///
    /// # Errors
    ///
    /// Returns an already-exists error if the new set repeats an id; the
    /// registry is left untouched in that case.
    pub fn replace_all(
        &self,
        new_events: Vec<Arc<Event>>,
        new_participants: Vec<Arc<Participant>>,
    ) -> Result<(), RegistryError> {
        let mut event_catalog: Catalog<EventId, Event> = Catalog::new();
        for event in new_events {
            if let Some(existing) = event_catalog.get(event.id()) {
                return Err(RegistryError::EventAlreadyExists {
                    id: event.id().clone(),
                    existing_name: existing.name(),
                });
            }
            event_catalog.insert(event.id().clone(), event);
        }
        let mut participant_catalog: Catalog<ParticipantId, Participant> = Catalog::new();
        for participant in new_participants {
            if let Some(existing) = participant_catalog.get(participant.id()) {
                return Err(RegistryError::ParticipantAlreadyExists {
                    id: participant.id().clone(),
                    existing_name: existing.name().to_owned(),
                });
            }
            participant_catalog.insert(participant.id().clone(), participant);
        }

        let mut events = self.events.write();
        let mut participants = self.participants.write();
        if !events.is_empty() || !participants.is_empty() {
            warn!(
                events = events.len(),
                participants = participants.len(),
                "Replacing non-empty registry"
            );
        }
        *events = event_catalog;
        *participants = participant_catalog;
        info!(
            events = events.len(),
            participants = participants.len(),
            "Registry contents replaced"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Events whose name contains the needle (case-insensitive).
    pub fn search_by_name(&self, needle: &str) -> Vec<Arc<Event>> {
        let needle = needle.to_lowercase();
        self.events_where(|e| e.name().to_lowercase().contains(&needle))
    }

    /// Events whose location contains the needle (case-insensitive).
    pub fn search_by_location(&self, needle: &str) -> Vec<Arc<Event>> {
        let needle = needle.to_lowercase();
        self.events_where(|e| e.location().to_lowercase().contains(&needle))
    }

    /// Events of one variant.
    pub fn events_of_type(&self, event_type: EventType) -> Vec<Arc<Event>> {
        self.events_where(|e| e.event_type() == event_type)
    }

    /// Events dated within `[from, to]`.
    pub fn events_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Arc<Event>> {
        self.events_where(|e| (from..=to).contains(&e.date()))
    }

    /// Events the participant is enrolled in.
    pub fn events_of_participant(&self, participant: &ParticipantId) -> Vec<Arc<Event>> {
        self.events_where(|e| e.is_enrolled(participant))
    }

    fn events_where(&self, predicate: impl Fn(&Event) -> bool) -> Vec<Arc<Event>> {
        self.events()
            .into_iter()
            .filter(|e| predicate(e))
            .collect()
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats::compute(&self.events(), &self.participants())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use rendezvous_types::NotificationKind;

    use super::*;
    use crate::event::EventParams;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 12, day)
            .and_then(|d| d.and_hms_opt(20, 0, 0))
            .unwrap_or_default()
    }

    fn seeded() -> EventRegistry {
        let registry = EventRegistry::new();
        let talk = EventParams::new("T1", "Rust in Production", at(3), "Room A", 2);
        let concert = EventParams::new("C1", "Winter Jazz", at(10), "Blue Hall", 3);
        registry.add_event(Event::talk(talk, "Rust").unwrap()).unwrap();
        registry
            .add_event(Event::concert(concert, "Trio", "Jazz").unwrap())
            .unwrap();
        registry
            .add_participant(Participant::new("A", "Alice", "alice@example.com"))
            .unwrap();
        registry
            .add_participant(Participant::new("B", "Bob", "bob@example.com"))
            .unwrap();
        registry
            .add_participant(Participant::organizer("O", "Olga", "olga@example.com"))
            .unwrap();
        registry
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let registry = seeded();
        let dup = Event::concert(EventParams::new("T1", "Other", at(1), "x", 1), "a", "g").unwrap();
        let err = registry.add_event(dup).unwrap_err();
        assert_eq!(err.code(), "EVENT_EXISTS");
        assert!(err.user_message().contains("Rust in Production"));

        let err = registry
            .add_participant(Participant::new("A", "Alias", "alias@example.com"))
            .unwrap_err();
        assert_eq!(err.code(), "PARTICIPANT_EXISTS");
        assert_eq!(registry.participant_count(), 3);
    }

    #[test]
    fn unknown_ids_fail_before_delegating() {
        let registry = seeded();
        assert!(matches!(
            registry.enroll_participant(&ParticipantId::new("nobody"), &EventId::new("T1")),
            Err(RegistryError::ParticipantNotFound(_))
        ));
        assert!(matches!(
            registry.enroll_participant(&ParticipantId::new("A"), &EventId::new("nope")),
            Err(RegistryError::EventNotFound(_))
        ));
        assert!(matches!(
            registry.remove_event(&EventId::new("nope")),
            Err(RegistryError::EventNotFound(_))
        ));
    }

    #[test]
    fn remove_event_cancels_members_first() {
        let registry = seeded();
        let t1 = EventId::new("T1");
        registry.enroll_participant(&ParticipantId::new("A"), &t1).unwrap();
        let alice = registry.find_participant(&ParticipantId::new("A")).unwrap();
        alice.clear_inbox();

        let removed = registry.remove_event(&t1).unwrap();

        assert!(removed.is_cancelled());
        assert_eq!(
            alice.inbox().first().map(|n| n.kind),
            Some(NotificationKind::Cancelled)
        );
        assert!(registry.find_event(&t1).is_err());
        assert_eq!(registry.event_count(), 1);
    }

    #[test]
    fn removed_event_is_frozen_even_without_members() {
        let registry = seeded();
        let removed = registry.remove_event(&EventId::new("C1")).unwrap();

        assert!(removed.is_cancelled());
        let alice = registry.find_participant(&ParticipantId::new("A")).unwrap();
        assert!(matches!(
            removed.enroll(alice),
            Err(RegistryError::EventCancelled { .. })
        ));
        assert_eq!(removed.enrolled_count(), 0);
    }

    #[test]
    fn modify_event_applies_only_given_fields() {
        let registry = seeded();
        let c1 = EventId::new("C1");
        registry.enroll_participant(&ParticipantId::new("B"), &c1).unwrap();
        let bob = registry.find_participant(&ParticipantId::new("B")).unwrap();
        bob.clear_inbox();

        let changed = registry
            .modify_event(
                &c1,
                EventChanges {
                    name: Some("Winter Jazz".to_owned()),
                    location: Some("Green Hall".to_owned()),
                    ..EventChanges::default()
                },
            )
            .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(bob.inbox_len(), 1);
        assert_eq!(registry.find_event(&c1).unwrap().location(), "Green Hall");
    }

    #[test]
    fn organizer_assignment_and_cleanup() {
        let registry = seeded();
        let (t1, olga) = (EventId::new("T1"), ParticipantId::new("O"));
        assert!(registry.assign_organizer(&olga, &t1).unwrap());
        assert!(!registry.assign_organizer(&olga, &t1).unwrap());
        assert!(matches!(
            registry.assign_organizer(&ParticipantId::new("A"), &t1),
            Err(RegistryError::NotAnOrganizer(_))
        ));

        registry.remove_event(&t1).unwrap();
        let organizer = registry.find_participant(&olga).unwrap();
        assert!(!organizer.organizes(&t1));
    }

    #[test]
    fn queries_filter_in_insertion_order() {
        let registry = seeded();
        assert_eq!(registry.search_by_name("rust").len(), 1);
        assert_eq!(registry.search_by_location("HALL").len(), 1);
        assert_eq!(registry.events_of_type(EventType::Concert).len(), 1);
        assert_eq!(registry.events_between(at(3), at(10)).len(), 2);
        assert_eq!(registry.events_between(at(4), at(9)).len(), 0);

        let ids: Vec<String> = registry.events().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["T1".to_owned(), "C1".to_owned()]);

        registry
            .enroll_participant(&ParticipantId::new("A"), &EventId::new("C1"))
            .unwrap();
        assert_eq!(registry.events_of_participant(&ParticipantId::new("A")).len(), 1);
    }

    #[test]
    fn clear_and_replace() {
        let registry = seeded();
        let events = registry.events();
        let participants = registry.participants();

        registry.clear_all();
        assert_eq!(registry.event_count(), 0);
        assert_eq!(registry.participant_count(), 0);

        registry.replace_all(events.clone(), participants).unwrap();
        assert_eq!(registry.event_count(), 2);

        let mut doubled = events.clone();
        doubled.extend(events);
        assert!(registry.replace_all(doubled, Vec::new()).is_err());
        assert_eq!(registry.event_count(), 2);

        let twins = vec![
            Arc::new(Participant::new("Z", "Zoe", "zoe@example.com")),
            Arc::new(Participant::new("Z", "Zed", "zed@example.com")),
        ];
        assert!(matches!(
            registry.replace_all(Vec::new(), twins),
            Err(RegistryError::ParticipantAlreadyExists { .. })
        ));
        assert_eq!(registry.participant_count(), 3);
    }

    #[test]
    fn stats_reflect_registry() {
        let registry = seeded();
        registry
            .enroll_participant(&ParticipantId::new("A"), &EventId::new("T1"))
            .unwrap();
        let stats = registry.stats();
        assert_eq!(stats.event_count, 2);
        assert_eq!(stats.organizer_count, 1);
        assert_eq!(stats.total_enrollments, 1);
        assert_eq!(stats.total_subscribers, 1);
    }
}
