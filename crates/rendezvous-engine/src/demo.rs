//! Sample data and the observer demonstration.
//!
//! [`seed`] fills an empty registry with a small catalog so a first run has
//! something to save. [`run_observer_demo`] works on a scratch registry and
//! walks one talk through enrollment, two info changes, and deletion, then
//! reports what each member's inbox received.

use chrono::{NaiveDate, NaiveDateTime};
use rendezvous_registry::{Event, EventChanges, EventParams, EventRegistry, Participant};
use rendezvous_types::{EventId, NotificationKind, ParticipantId, Speaker};
use tracing::info;

use crate::error::EngineError;

/// Inbox contents of one demo member after the walk-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberReport {
    /// Member id.
    pub participant: ParticipantId,
    /// Kinds received, in delivery order.
    pub received: Vec<NotificationKind>,
}

/// Outcome of [`run_observer_demo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    /// The demo event.
    pub event: EventId,
    /// Members notified by the cancellation that precedes deletion.
    pub cancelled_deliveries: usize,
    /// Per-member inbox contents.
    pub members: Vec<MemberReport>,
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Result<NaiveDateTime, EngineError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| EngineError::Demo {
            message: format!("invalid sample date {year}-{month}-{day} {hour}:{minute}"),
        })
}

/// Fill `registry` with sample events and participants.
///
/// Returns `false` without touching anything when the registry already
/// holds events.
pub fn seed(registry: &EventRegistry) -> Result<bool, EngineError> {
    if registry.event_count() > 0 {
        return Ok(false);
    }

    let keynote = registry.add_event(Event::talk(
        EventParams::new("T-RUST", "Fearless Concurrency", at(2027, 3, 12, 9, 30)?, "Lyon", 120),
        "Ownership and threads",
    )?)?;
    keynote.add_speaker(
        Speaker::new("Ines Moreau", "Systems programming").with_biography("Maintains a lock-free queue"),
    )?;
    registry.add_event(Event::talk(
        EventParams::new("T-DATA", "Columnar Storage", at(2027, 4, 2, 14, 0)?, "Nantes", 60),
        "Compression in analytical engines",
    )?)?;
    registry.add_event(Event::concert(
        EventParams::new("C-JAZZ", "Late Set", at(2027, 3, 20, 21, 0)?, "Bordeaux", 300),
        "Quartet Nord",
        "Jazz",
    )?)?;
    registry.add_event(Event::concert(
        EventParams::new("C-ELEC", "Warehouse Night", at(2027, 5, 8, 23, 0)?, "Lille", 800),
        "Pulse Drive",
        "Electronic",
    )?)?;

    registry.add_participant(Participant::new("P-ALICE", "Alice Martin", "alice.martin@example.com"))?;
    registry.add_participant(Participant::new("P-BRUNO", "Bruno Petit", "bruno.petit@example.com"))?;
    registry.add_participant(Participant::new("P-CLARA", "Clara Roux", "clara.roux@example.com"))?;
    registry.add_participant(Participant::organizer(
        "O-DAVID",
        "David Leroy",
        "david.leroy@example.com",
    ))?;
    registry.assign_organizer(&ParticipantId::new("O-DAVID"), &EventId::new("T-RUST"))?;

    for (participant, event) in [
        ("P-ALICE", "T-RUST"),
        ("P-BRUNO", "T-RUST"),
        ("P-BRUNO", "C-JAZZ"),
        ("P-CLARA", "C-ELEC"),
        ("O-DAVID", "T-RUST"),
    ] {
        registry.enroll_participant(&ParticipantId::new(participant), &EventId::new(event))?;
    }

    info!(
        events = registry.event_count(),
        participants = registry.participant_count(),
        "Sample data seeded"
    );
    Ok(true)
}

/// Walk a talk through the observer lifecycle on a scratch registry.
///
/// Two members enroll, the venue moves, the event is renamed, and finally
/// it is deleted, which cancels it first so both members are told.
pub fn run_observer_demo() -> Result<DemoReport, EngineError> {
    let registry = EventRegistry::new();
    let event_id = EventId::generate();
    registry.add_event(Event::talk(
        EventParams::new(event_id.clone(), "Observer Walkthrough", at(2027, 6, 1, 18, 0)?, "Room 1", 10),
        "Change notification",
    )?)?;

    let members = [
        registry.add_participant(Participant::new("DEMO-A", "Ana", "ana@example.com"))?,
        registry.add_participant(Participant::new("DEMO-B", "Ben", "ben@example.com"))?,
    ];
    for member in &members {
        registry.enroll_participant(member.id(), &event_id)?;
    }

    registry.modify_event(
        &event_id,
        EventChanges {
            location: Some("Auditorium".to_owned()),
            ..EventChanges::default()
        },
    )?;
    registry.modify_event(
        &event_id,
        EventChanges {
            name: Some("Observer Walkthrough (extended)".to_owned()),
            ..EventChanges::default()
        },
    )?;

    let removed = registry.remove_event(&event_id)?;
    let cancelled_deliveries = members
        .iter()
        .filter(|m| m.inbox().iter().any(|n| n.kind == NotificationKind::Cancelled))
        .count();

    let members = members
        .iter()
        .map(|member| MemberReport {
            participant: member.id().clone(),
            received: member.inbox().iter().map(|n| n.kind).collect(),
        })
        .collect();

    info!(
        event_id = %removed.id(),
        cancelled_deliveries,
        "Observer demonstration finished"
    );
    Ok(DemoReport {
        event: event_id,
        cancelled_deliveries,
        members,
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    #[test]
    fn seed_fills_an_empty_registry_once() {
        let registry = EventRegistry::new();

        assert!(seed(&registry).unwrap());
        assert_eq!(registry.event_count(), 4);
        assert_eq!(registry.participant_count(), 4);
        let keynote = registry.find_event(&EventId::new("T-RUST")).unwrap();
        assert_eq!(keynote.enrolled_count(), 3);
        assert_eq!(keynote.subscriber_count(), 3);

        assert!(!seed(&registry).unwrap());
        assert_eq!(registry.event_count(), 4);
    }

    #[test]
    fn demo_members_see_every_change_then_the_cancellation() {
        let report = run_observer_demo().unwrap();

        assert_eq!(report.cancelled_deliveries, 2);
        // Scratch event ids are UUID v7 strings.
        assert_eq!(report.event.as_str().len(), 36);
        // Ana also hears about Ben joining after her.
        assert_eq!(report.members[0].received.len(), 5);
        assert_eq!(report.members[1].received.len(), 4);
        for member in &report.members {
            assert_eq!(member.received[0], NotificationKind::Modified);
            let tail = &member.received[member.received.len() - 3..];
            assert_eq!(
                tail,
                [
                    NotificationKind::InfoChanged,
                    NotificationKind::InfoChanged,
                    NotificationKind::Cancelled,
                ],
                "member {}",
                member.participant
            );
        }
    }
}
