//! End-to-end behavior of the registry: enrollment limits, membership and
//! subscription staying in lock-step, and concurrent access.

// Integration tests use unwrap extensively for clarity -- panicking on
// failure is the correct behavior in test code.
#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use rendezvous_registry::{
    Event, EventChanges, EventParams, EventRegistry, NotifyError, Participant, RegistryError,
    Subscriber,
};
use rendezvous_types::{EventId, NotificationKind, ParticipantId};

fn evening(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2027, 3, day)
        .and_then(|d| d.and_hms_opt(19, 0, 0))
        .unwrap()
}

/// Counts callbacks per kind; used as a non-member observer.
#[derive(Default)]
struct Tally {
    modified: AtomicUsize,
    cancelled: AtomicUsize,
    info_changed: AtomicUsize,
}

impl Subscriber for Tally {
    fn subscriber_key(&self) -> &str {
        "tally"
    }

    fn on_modified(&self, _: &str, _: &str) -> Result<(), NotifyError> {
        self.modified.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_cancelled(&self, _: &str, _: &str) -> Result<(), NotifyError> {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_info_changed(&self, _: &str, _: &str) -> Result<(), NotifyError> {
        self.info_changed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reads the event back from inside a callback.
struct Reentrant {
    event: Arc<Event>,
    seen: AtomicUsize,
}

impl Subscriber for Reentrant {
    fn subscriber_key(&self) -> &str {
        "reentrant"
    }

    fn on_modified(&self, _: &str, _: &str) -> Result<(), NotifyError> {
        let count = usize::try_from(self.event.enrolled_count()).unwrap();
        self.seen.store(count, Ordering::SeqCst);
        Ok(())
    }

    fn on_cancelled(&self, _: &str, _: &str) -> Result<(), NotifyError> {
        Ok(())
    }

    fn on_info_changed(&self, _: &str, _: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

fn registry_with_talk(capacity: u32) -> EventRegistry {
    let registry = EventRegistry::new();
    let params = EventParams::new("T1", "X", evening(4), "Main Room", capacity);
    registry.add_event(Event::talk(params, "Observers").unwrap()).unwrap();
    for (id, name) in [("A", "Alice"), ("B", "Bob"), ("C", "Carol")] {
        registry
            .add_participant(Participant::new(id, name, format!("{id}@example.com")))
            .unwrap();
    }
    registry
}

#[test]
fn talk_with_capacity_two_rejects_third_enrollment() {
    let registry = registry_with_talk(2);
    let t1 = EventId::new("T1");

    registry.enroll_participant(&ParticipantId::new("A"), &t1).unwrap();
    registry.enroll_participant(&ParticipantId::new("B"), &t1).unwrap();

    let event = registry.find_event(&t1).unwrap();
    assert_eq!(event.enrolled_count(), 2);
    assert_eq!(event.subscriber_count(), 2);

    let err = registry
        .enroll_participant(&ParticipantId::new("C"), &t1)
        .unwrap_err();
    assert_eq!(err.code(), "CAPACITY_EXCEEDED");
    assert_eq!(err.remaining_seats(), Some(0));
    assert_eq!(event.enrolled_count(), 2);
    assert_eq!(event.subscriber_count(), 2);
}

#[test]
fn enrollment_and_subscription_move_together() {
    let registry = registry_with_talk(5);
    let t1 = EventId::new("T1");
    let alice = ParticipantId::new("A");

    registry.enroll_participant(&alice, &t1).unwrap();
    let event = registry.find_event(&t1).unwrap();
    assert!(event.is_enrolled(&alice));
    assert!(event.subscriber_keys().contains(&"A".to_owned()));

    assert!(registry.withdraw_participant(&alice, &t1).unwrap());
    assert!(!event.is_enrolled(&alice));
    assert!(event.subscriber_keys().is_empty());
}

#[test]
fn cancelling_notifies_every_member_once() {
    let registry = registry_with_talk(5);
    let t1 = EventId::new("T1");
    for id in ["A", "B", "C"] {
        registry.enroll_participant(&ParticipantId::new(id), &t1).unwrap();
    }
    let members = registry.participants();
    for member in &members {
        member.clear_inbox();
    }

    let delivery = registry.cancel_event(&t1).unwrap();

    assert_eq!(delivery.delivered, 3);
    for member in &members {
        let cancellations = member
            .inbox()
            .iter()
            .filter(|n| n.kind == NotificationKind::Cancelled)
            .count();
        assert_eq!(cancellations, 1);
    }
}

#[test]
fn cancelling_twice_fans_out_twice_without_touching_membership() {
    let registry = registry_with_talk(5);
    let t1 = EventId::new("T1");
    registry.enroll_participant(&ParticipantId::new("A"), &t1).unwrap();
    let event = registry.find_event(&t1).unwrap();
    let tally = Arc::new(Tally::default());
    event.subscribe(tally.clone()).unwrap();

    event.cancel();
    event.cancel();

    assert!(event.is_cancelled());
    assert_eq!(event.enrolled_count(), 1);
    assert_eq!(tally.cancelled.load(Ordering::SeqCst), 2);
    assert!(matches!(
        registry.enroll_participant(&ParticipantId::new("B"), &t1),
        Err(RegistryError::EventCancelled { .. })
    ));
}

#[test]
fn renaming_to_the_same_name_is_silent() {
    let registry = registry_with_talk(5);
    let t1 = EventId::new("T1");
    let event = registry.find_event(&t1).unwrap();
    let tally = Arc::new(Tally::default());
    event.subscribe(tally.clone()).unwrap();

    let same = EventChanges {
        name: Some("X".to_owned()),
        ..EventChanges::default()
    };
    assert_eq!(registry.modify_event(&t1, same).unwrap(), 0);
    assert_eq!(tally.info_changed.load(Ordering::SeqCst), 0);

    let renamed = EventChanges {
        name: Some("Y".to_owned()),
        ..EventChanges::default()
    };
    assert_eq!(registry.modify_event(&t1, renamed).unwrap(), 1);
    assert_eq!(tally.info_changed.load(Ordering::SeqCst), 1);
    assert_eq!(event.name(), "Y");
}

#[test]
fn callbacks_can_read_the_event() {
    let registry = registry_with_talk(5);
    let event = registry.find_event(&EventId::new("T1")).unwrap();
    let observer = Arc::new(Reentrant {
        event: Arc::clone(&event),
        seen: AtomicUsize::new(0),
    });
    event.subscribe(observer.clone()).unwrap();

    registry
        .enroll_participant(&ParticipantId::new("A"), &EventId::new("T1"))
        .unwrap();

    assert_eq!(observer.seen.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_enrollment_never_exceeds_capacity() {
    let registry = EventRegistry::new();
    let params = EventParams::new("BIG", "Crowded", evening(9), "Arena", 10);
    let event = registry
        .add_event(Event::concert(params, "Crowd", "Rock").unwrap())
        .unwrap();
    let ids: Vec<ParticipantId> = (0..64)
        .map(|i| {
            let p = Participant::new(format!("P{i}"), format!("Fan {i}"), format!("fan{i}@example.com"));
            registry.add_participant(p).unwrap().id().clone()
        })
        .collect();

    let accepted = AtomicUsize::new(0);
    std::thread::scope(|scope| {
        for chunk in ids.chunks(8) {
            let (registry, accepted) = (&registry, &accepted);
            scope.spawn(move || {
                for id in chunk {
                    if registry.enroll_participant(id, &EventId::new("BIG")).is_ok() {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    assert_eq!(accepted.load(Ordering::SeqCst), 10);
    assert_eq!(event.enrolled_count(), 10);
    assert_eq!(event.subscriber_count(), 10);
    let keys = event.subscriber_keys();
    for member in event.enrolled() {
        assert!(keys.contains(&member.id().to_string()));
    }
}

#[test]
fn concurrent_enroll_and_withdraw_keep_sets_in_step() {
    let registry = EventRegistry::new();
    let params = EventParams::new("E", "Churn", evening(12), "Hall", 8);
    let event = registry
        .add_event(Event::talk(params, "Churn").unwrap())
        .unwrap();
    let people: Vec<Arc<Participant>> = (0..8)
        .map(|i| {
            registry
                .add_participant(Participant::new(format!("P{i}"), format!("P{i}"), format!("p{i}@example.com")))
                .unwrap()
        })
        .collect();

    std::thread::scope(|scope| {
        for person in &people {
            let event = &event;
            scope.spawn(move || {
                for _ in 0..25 {
                    let _ = event.enroll(Arc::clone(person));
                    let _ = event.withdraw(person.id());
                }
            });
        }
    });

    assert_eq!(
        usize::try_from(event.enrolled_count()).unwrap(),
        event.subscriber_count()
    );
}
