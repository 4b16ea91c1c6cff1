//! Structural checks on a snapshot document.
//!
//! The same rules guard both directions: a document is checked before it
//! is written (so nothing unloadable ever reaches disk) and again after it
//! is read. Every violation is collected; the caller decides whether any
//! of them is fatal.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::config::MAX_CLOCK_SKEW_SECS;
use crate::records::{EventKindRecord, SnapshotDocument};

/// Field names of a failed `validator` check, sorted for stable output.
fn invalid_fields(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(ToString::to_string)
        .collect();
    fields.sort();
    fields.join(", ")
}

/// Collect every violation in the document.
pub fn violations(doc: &SnapshotDocument, now: DateTime<Utc>) -> Vec<String> {
    let mut out = Vec::new();
    check_metadata(doc, now, &mut out);
    check_participants(doc, &mut out);
    check_events(doc, &mut out);
    check_stats(doc, &mut out);
    out
}

fn check_metadata(doc: &SnapshotDocument, now: DateTime<Utc>, out: &mut Vec<String>) {
    if doc.app_version.trim().is_empty() {
        out.push("appVersion is missing".to_owned());
    }
    if doc.saved_at.signed_duration_since(now).num_seconds() > MAX_CLOCK_SKEW_SECS {
        out.push(format!("savedAt {} lies in the future", doc.saved_at));
    }
}

fn check_participants(doc: &SnapshotDocument, out: &mut Vec<String>) {
    let event_ids: HashSet<_> = doc.events.iter().map(|e| &e.id).collect();
    let mut ids = HashSet::new();
    let mut emails = HashSet::new();

    for participant in &doc.participants {
        if participant.id.is_blank() {
            out.push("participant with missing id".to_owned());
        } else if !ids.insert(&participant.id) {
            out.push(format!("duplicate participant id '{}'", participant.id));
        }
        if let Err(errors) = participant.validate() {
            out.push(format!(
                "participant '{}' has invalid {}",
                participant.id,
                invalid_fields(&errors)
            ));
        }
        if !emails.insert(participant.email.to_lowercase()) {
            out.push(format!(
                "participant '{}' reuses email '{}'",
                participant.id, participant.email
            ));
        }
        for organized in participant.organized() {
            if !event_ids.contains(organized) {
                out.push(format!(
                    "organizer '{}' references unknown event '{organized}'",
                    participant.id
                ));
            }
        }
    }
}

fn check_events(doc: &SnapshotDocument, out: &mut Vec<String>) {
    let participant_ids: HashSet<_> = doc.participants.iter().map(|p| &p.id).collect();
    let mut ids = HashSet::new();

    for event in &doc.events {
        if event.id.is_blank() {
            out.push("event with missing id".to_owned());
        } else if !ids.insert(&event.id) {
            out.push(format!("duplicate event id '{}'", event.id));
        }
        if let Err(errors) = event.validate() {
            out.push(format!(
                "event '{}' has invalid {}",
                event.id,
                invalid_fields(&errors)
            ));
        }
        if let EventKindRecord::Talk { speakers, .. } = &event.kind {
            if speakers.iter().any(|s| s.name.trim().is_empty()) {
                out.push(format!("talk '{}' lists a speaker without a name", event.id));
            }
        }

        let enrolled = event.participants.len();
        if !u32::try_from(enrolled).is_ok_and(|n| n <= event.capacity_max) {
            out.push(format!(
                "event '{}' has {enrolled} participants for {} seats",
                event.id, event.capacity_max
            ));
        }

        let mut roster = HashSet::new();
        for entry in &event.participants {
            let id = entry.id();
            if !participant_ids.contains(id) {
                out.push(format!(
                    "event '{}' references unknown participant '{id}'",
                    event.id
                ));
            }
            if !roster.insert(id) {
                out.push(format!("event '{}' lists participant '{id}' twice", event.id));
            }
        }
    }
}

fn check_stats(doc: &SnapshotDocument, out: &mut Vec<String>) {
    let Some(stats) = &doc.stats else {
        return;
    };
    if stats.talk_count.saturating_add(stats.concert_count) != doc.events.len() {
        out.push(format!(
            "stats count {} talks and {} concerts but the snapshot holds {} events",
            stats.talk_count,
            stats.concert_count,
            doc.events.len()
        ));
    }
    if stats.organizer_count.saturating_add(stats.participant_count) != doc.participants.len() {
        out.push(format!(
            "stats count {} organizers and {} participants but the snapshot holds {}",
            stats.organizer_count,
            stats.participant_count,
            doc.participants.len()
        ));
    }
    let enrollments = total_enrollments(doc);
    if stats.total_enrollments != enrollments {
        out.push(format!(
            "stats record {} enrollments but events list {enrollments}",
            stats.total_enrollments
        ));
    }
}

/// Sum of roster sizes over all events.
pub fn total_enrollments(doc: &SnapshotDocument) -> u64 {
    doc.events
        .iter()
        .map(|e| u64::try_from(e.participants.len()).unwrap_or(u64::MAX))
        .fold(0, u64::saturating_add)
}

/// Whether `totalSubscribersAtSave` is plausible for the recorded rosters.
///
/// Non-member observers are not persisted, so a gap of up to one per event
/// is tolerated.
pub fn subscriber_total_is_plausible(doc: &SnapshotDocument) -> bool {
    let tolerance = u64::try_from(doc.events.len()).unwrap_or(u64::MAX);
    doc.total_subscribers_at_save.abs_diff(total_enrollments(doc)) <= tolerance
}
