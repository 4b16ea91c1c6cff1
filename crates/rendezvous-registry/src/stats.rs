//! Aggregate figures over the whole registry.

use std::sync::Arc;

use rendezvous_types::{EventId, EventType};
use rust_decimal::Decimal;

use crate::event::Event;
use crate::participant::Participant;

/// Subscriber count of a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSubscribers {
    /// Event id.
    pub id: EventId,
    /// Event name at computation time.
    pub name: String,
    /// Number of subscribers.
    pub subscribers: usize,
}

/// Registry-wide statistics, computed from one consistent listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of events.
    pub event_count: usize,
    /// Number of participants (organizers included).
    pub participant_count: usize,
    /// Number of talks.
    pub talk_count: usize,
    /// Number of concerts.
    pub concert_count: usize,
    /// Number of cancelled events.
    pub cancelled_count: usize,
    /// Number of organizers.
    pub organizer_count: usize,
    /// Sum of enrolled participants over all events.
    pub total_enrollments: u64,
    /// Sum of subscribers over all events.
    pub total_subscribers: u64,
    /// Mean occupancy percentage over all events, `None` when empty.
    pub average_occupancy_pct: Option<Decimal>,
    /// Subscriber counts per event, in registry order.
    pub subscribers_per_event: Vec<EventSubscribers>,
}

impl RegistryStats {
    /// Compute statistics over the given events and participants.
    pub fn compute(events: &[Arc<Event>], participants: &[Arc<Participant>]) -> Self {
        let mut stats = Self {
            event_count: events.len(),
            participant_count: participants.len(),
            organizer_count: participants.iter().filter(|p| p.is_organizer()).count(),
            ..Self::default()
        };

        let mut occupancy_sum = Decimal::ZERO;
        for event in events {
            let view = event.view();
            match view.details.event_type() {
                EventType::Talk => stats.talk_count = stats.talk_count.saturating_add(1),
                EventType::Concert => stats.concert_count = stats.concert_count.saturating_add(1),
            }
            if view.cancelled {
                stats.cancelled_count = stats.cancelled_count.saturating_add(1);
            }
            let enrolled = u64::try_from(view.enrolled.len()).unwrap_or(u64::MAX);
            stats.total_enrollments = stats.total_enrollments.saturating_add(enrolled);
            let subscribers = u64::try_from(view.subscriber_count).unwrap_or(u64::MAX);
            stats.total_subscribers = stats.total_subscribers.saturating_add(subscribers);
            let occupancy = exact_occupancy(view.enrolled.len(), view.capacity);
            occupancy_sum = occupancy_sum.saturating_add(occupancy);
            stats.subscribers_per_event.push(EventSubscribers {
                id: view.id,
                name: view.name,
                subscribers: view.subscriber_count,
            });
        }

        if !events.is_empty() {
            stats.average_occupancy_pct = occupancy_sum
                .checked_div(Decimal::from(events.len()))
                .map(|avg| avg.round_dp(2));
        }
        stats
    }

    /// Participants that are not organizers.
    pub const fn standard_count(&self) -> usize {
        self.participant_count.saturating_sub(self.organizer_count)
    }
}

/// Unrounded occupancy percentage; rounding happens once on the mean.
fn exact_occupancy(enrolled: usize, capacity: u32) -> Decimal {
    Decimal::from(enrolled)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|v| v.checked_div(Decimal::from(capacity)))
        .unwrap_or(Decimal::ZERO)
}

impl core::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "=== Registry statistics ===")?;
        writeln!(
            f,
            "Events: {} ({} talks, {} concerts, {} cancelled)",
            self.event_count, self.talk_count, self.concert_count, self.cancelled_count
        )?;
        writeln!(
            f,
            "Participants: {} ({} organizers)",
            self.participant_count, self.organizer_count
        )?;
        writeln!(f, "Enrollments: {}", self.total_enrollments)?;
        writeln!(f, "Subscriptions: {}", self.total_subscribers)?;
        match self.average_occupancy_pct {
            Some(avg) => writeln!(f, "Average occupancy: {avg}%")?,
            None => writeln!(f, "Average occupancy: n/a")?,
        }
        for entry in &self.subscribers_per_event {
            writeln!(
                f,
                "  - {} ({}): {} subscribers",
                entry.name, entry.id, entry.subscribers
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::event::EventParams;

    fn params(id: &str, capacity: u32) -> EventParams {
        EventParams::new(id, id, NaiveDateTime::default(), "Hall", capacity)
    }

    #[test]
    fn empty_registry_has_no_average() {
        let stats = RegistryStats::compute(&[], &[]);
        assert_eq!(stats.event_count, 0);
        assert_eq!(stats.average_occupancy_pct, None);
        assert!(stats.to_string().contains("n/a"));
    }

    #[test]
    fn counts_variants_enrollments_and_occupancy() {
        let talk = Arc::new(Event::talk(params("T1", 2), "Rust").unwrap());
        let gig = Arc::new(Event::concert(params("C1", 4), "Band", "Rock").unwrap());
        let alice = Arc::new(Participant::new("P1", "Alice", "alice@example.com"));
        let olga = Arc::new(Participant::organizer("O1", "Olga", "olga@example.com"));
        talk.enroll(Arc::clone(&alice)).unwrap();
        talk.enroll(Arc::clone(&olga)).unwrap();
        gig.enroll(Arc::clone(&alice)).unwrap();
        gig.cancel();

        let stats = RegistryStats::compute(&[talk, gig], &[alice, olga]);

        assert_eq!(stats.talk_count, 1);
        assert_eq!(stats.concert_count, 1);
        assert_eq!(stats.cancelled_count, 1);
        assert_eq!(stats.organizer_count, 1);
        assert_eq!(stats.standard_count(), 1);
        assert_eq!(stats.total_enrollments, 3);
        assert_eq!(stats.total_subscribers, 3);
        // (100 + 25) / 2
        assert_eq!(stats.average_occupancy_pct, Some(Decimal::new(6250, 2)));
        assert_eq!(stats.subscribers_per_event.len(), 2);
    }

    #[test]
    fn average_rounds_the_mean_not_each_event() {
        let full = Arc::new(Event::talk(params("T1", 1), "Rust").unwrap());
        let third = Arc::new(Event::talk(params("T2", 3), "Go").unwrap());
        full.enroll(Arc::new(Participant::new("P1", "Alice", "alice@example.com")))
            .unwrap();
        third
            .enroll(Arc::new(Participant::new("P2", "Ben", "ben@example.com")))
            .unwrap();

        let stats = RegistryStats::compute(&[full, third], &[]);

        // (100 + 33.333...) / 2, not (100 + 33.33) / 2
        assert_eq!(stats.average_occupancy_pct, Some(Decimal::new(6667, 2)));
    }
}
