//! The subscriber capability and the notification fan-out loop.
//!
//! Every [`Event`](crate::Event) owns a list of [`Subscriber`]s. A change
//! to the event is delivered to each of them in insertion order through
//! [`fan_out`]. A subscriber whose callback fails is logged and skipped;
//! the loop always runs to completion and the mutation that triggered it
//! still succeeds.
//!
//! # Delivery guarantees
//!
//! - **Ordered**: subscribers are visited in the order they subscribed.
//! - **Isolated**: one failing callback never blocks the others.
//! - **Not atomic**: a failure mid-loop leaves earlier subscribers notified.

use std::sync::Arc;

use rendezvous_types::NotificationKind;
use tracing::{debug, warn};

/// A subscriber callback refused or failed to handle a notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("subscriber {subscriber} failed to handle notification: {reason}")]
pub struct NotifyError {
    /// Key of the failing subscriber.
    pub subscriber: String,
    /// Description of the failure.
    pub reason: String,
}

/// Something that receives change notifications from events.
///
/// Participants implement this; so can any non-member observer (an audit
/// log, a mailer). Identity is the [`subscriber_key`]: an event never holds
/// two subscribers with the same key.
///
/// [`subscriber_key`]: Subscriber::subscriber_key
pub trait Subscriber: Send + Sync {
    /// Stable identity of this subscriber.
    fn subscriber_key(&self) -> &str;

    /// Membership of the event changed.
    fn on_modified(&self, event_name: &str, message: &str) -> Result<(), NotifyError>;

    /// The event was cancelled.
    fn on_cancelled(&self, event_name: &str, message: &str) -> Result<(), NotifyError>;

    /// A descriptive field of the event changed.
    fn on_info_changed(&self, event_name: &str, message: &str) -> Result<(), NotifyError>;
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Callbacks that returned `Ok`.
    pub delivered: usize,
    /// Callbacks that returned an error (logged, then skipped).
    pub failed: usize,
}

impl Delivery {
    /// Total callbacks invoked.
    pub const fn attempted(&self) -> usize {
        self.delivered.saturating_add(self.failed)
    }
}

/// Route one notification to the matching callback of a subscriber.
fn deliver(
    subscriber: &dyn Subscriber,
    kind: NotificationKind,
    event_name: &str,
    message: &str,
) -> Result<(), NotifyError> {
    match kind {
        NotificationKind::Modified => subscriber.on_modified(event_name, message),
        NotificationKind::Cancelled => subscriber.on_cancelled(event_name, message),
        NotificationKind::InfoChanged => subscriber.on_info_changed(event_name, message),
    }
}

/// Deliver a notification to every subscriber in order.
///
/// Takes a snapshot of the subscriber list, so the caller must not hold the
/// event's lock: callbacks are free to read the event again.
pub fn fan_out(
    subscribers: &[Arc<dyn Subscriber>],
    kind: NotificationKind,
    event_name: &str,
    message: &str,
) -> Delivery {
    let mut outcome = Delivery::default();
    if subscribers.is_empty() {
        return outcome;
    }

    debug!(
        event_name,
        %kind,
        subscribers = subscribers.len(),
        "Fanning out notification"
    );

    for subscriber in subscribers {
        match deliver(subscriber.as_ref(), kind, event_name, message) {
            Ok(()) => outcome.delivered = outcome.delivered.saturating_add(1),
            Err(e) => {
                warn!(
                    event_name,
                    subscriber = subscriber.subscriber_key(),
                    error = %e,
                    "Subscriber callback failed, continuing fan-out"
                );
                outcome.failed = outcome.failed.saturating_add(1);
            }
        }
    }

    outcome
}
