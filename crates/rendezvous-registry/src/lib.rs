//! Events, participants, enrollment, and change notification.
//!
//! This crate is the core of the Rendezvous registry. Enrolling a
//! participant in an event also subscribes it to that event, so every later
//! change (rename, new date or venue, resize, cancellation) reaches each
//! member. Membership and subscription move together under one lock, and
//! subscriptions are never persisted: they are rebuilt from membership with
//! [`Event::reconstruct_subscriptions`].
//!
//! # Modules
//!
//! - [`error`] -- Business rule violations ([`RegistryError`])
//! - [`event`] -- Talks and concerts with the enrollment state machine ([`Event`])
//! - [`notify`] -- The [`Subscriber`] capability and ordered, failure-isolated fan-out
//! - [`participant`] -- Standard participants and organizers, with their inbox
//! - [`registry`] -- The owner of all entities ([`EventRegistry`])
//! - [`stats`] -- Aggregate figures ([`RegistryStats`])

pub mod error;
pub mod event;
pub mod notify;
pub mod participant;
pub mod registry;
pub mod stats;

pub use error::RegistryError;
pub use event::{DISPLAY_DATE_FORMAT, Event, EventDetails, EventParams, EventView};
pub use notify::{Delivery, NotifyError, Subscriber, fan_out};
pub use participant::{INBOX_CAPACITY, Participant};
pub use registry::{EventChanges, EventRegistry};
pub use stats::{EventSubscribers, RegistryStats};
