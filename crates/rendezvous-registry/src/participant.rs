//! Participants: identity, contact details, and the subscriber inbox.
//!
//! A [`Participant`] is shared as `Arc<Participant>` between the registry
//! catalog and the roster of every event it is enrolled in, so there is
//! exactly one canonical instance per id. Organizers additionally keep a
//! list of the events they organize, by id only.

use std::collections::VecDeque;

use parking_lot::{Mutex, RwLock};
use rendezvous_types::{EventId, Notification, NotificationKind, ParticipantId, ParticipantRole};
use tracing::info;

use crate::notify::{NotifyError, Subscriber};

/// Number of notifications kept per participant; older ones are dropped.
pub const INBOX_CAPACITY: usize = 100;

/// Variant-specific participant state.
#[derive(Debug)]
enum RoleState {
    Standard,
    Organizer {
        /// Back-references to organized events. Bookkeeping only.
        organized: RwLock<Vec<EventId>>,
    },
}

/// A person who can enroll in events and receives their notifications.
///
/// Equality is by id.
#[derive(Debug)]
pub struct Participant {
    id: ParticipantId,
    name: String,
    email: String,
    role: RoleState,
    inbox: Mutex<VecDeque<Notification>>,
}

impl Participant {
    /// Create a standard participant.
    pub fn new(
        id: impl Into<ParticipantId>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: RoleState::Standard,
            inbox: Mutex::new(VecDeque::new()),
        }
    }

    /// Create an organizer with no organized events yet.
    pub fn organizer(
        id: impl Into<ParticipantId>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            role: RoleState::Organizer {
                organized: RwLock::new(Vec::new()),
            },
            ..Self::new(id, name, email)
        }
    }

    /// The participant's id.
    pub const fn id(&self) -> &ParticipantId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contact email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Which variant this participant is.
    pub const fn role(&self) -> ParticipantRole {
        match self.role {
            RoleState::Standard => ParticipantRole::Standard,
            RoleState::Organizer { .. } => ParticipantRole::Organizer,
        }
    }

    /// Whether this participant is an organizer.
    pub const fn is_organizer(&self) -> bool {
        matches!(self.role, RoleState::Organizer { .. })
    }

    // -----------------------------------------------------------------------
    // Organizer bookkeeping
    // -----------------------------------------------------------------------

    /// Record that this organizer organizes an event.
    ///
    /// Returns `false` for standard participants and for events already
    /// recorded.
    pub fn add_organized_event(&self, event: EventId) -> bool {
        let RoleState::Organizer { organized } = &self.role else {
            return false;
        };
        let mut organized = organized.write();
        if organized.contains(&event) {
            return false;
        }
        info!(
            participant_id = %self.id,
            event_id = %event,
            "Organized event recorded"
        );
        organized.push(event);
        true
    }

    /// Forget an organized event. Returns whether it was recorded.
    pub fn remove_organized_event(&self, event: &EventId) -> bool {
        let RoleState::Organizer { organized } = &self.role else {
            return false;
        };
        let mut organized = organized.write();
        let before = organized.len();
        organized.retain(|e| e != event);
        organized.len() != before
    }

    /// Whether this organizer organizes the event.
    pub fn organizes(&self, event: &EventId) -> bool {
        match &self.role {
            RoleState::Standard => false,
            RoleState::Organizer { organized } => organized.read().contains(event),
        }
    }

    /// Events organized by this participant, in the order they were added.
    ///
    /// `None` for standard participants.
    pub fn organized_events(&self) -> Option<Vec<EventId>> {
        match &self.role {
            RoleState::Standard => None,
            RoleState::Organizer { organized } => Some(organized.read().clone()),
        }
    }

    // -----------------------------------------------------------------------
    // Inbox
    // -----------------------------------------------------------------------

    /// Notifications received so far, oldest first.
    pub fn inbox(&self) -> Vec<Notification> {
        self.inbox.lock().iter().cloned().collect()
    }

    /// Number of notifications in the inbox.
    pub fn inbox_len(&self) -> usize {
        self.inbox.lock().len()
    }

    /// Drop every stored notification.
    pub fn clear_inbox(&self) {
        self.inbox.lock().clear();
    }

    fn receive(&self, kind: NotificationKind, event_name: &str, message: &str) {
        info!(
            participant_id = %self.id,
            participant = %self.name,
            event_name,
            %kind,
            message,
            "Notification received"
        );
        let mut inbox = self.inbox.lock();
        if inbox.len() >= INBOX_CAPACITY {
            inbox.pop_front();
        }
        inbox.push_back(Notification::now(kind, event_name, message));
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Participant {}

impl core::fmt::Display for Participant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}{{id='{}', name='{}', email='{}'}}",
            self.role(),
            self.id,
            self.name,
            self.email
        )
    }
}

impl Subscriber for Participant {
    fn subscriber_key(&self) -> &str {
        self.id.as_str()
    }

    fn on_modified(&self, event_name: &str, message: &str) -> Result<(), NotifyError> {
        self.receive(NotificationKind::Modified, event_name, message);
        Ok(())
    }

    fn on_cancelled(&self, event_name: &str, message: &str) -> Result<(), NotifyError> {
        self.receive(NotificationKind::Cancelled, event_name, message);
        Ok(())
    }

    fn on_info_changed(&self, event_name: &str, message: &str) -> Result<(), NotifyError> {
        self.receive(NotificationKind::InfoChanged, event_name, message);
        Ok(())
    }
}
