//! Shared type definitions for the Rendezvous event registry.
//!
//! This crate holds the plain values that flow between the registry core
//! and the snapshot store. Nothing here has behavior beyond identity,
//! equality, and formatting.
//!
//! # Modules
//!
//! - [`ids`] -- Strongly-typed identifiers for events and participants
//! - [`enums`] -- Event variants, participant roles, notification kinds
//! - [`structs`] -- Speakers and delivered notifications

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EventType, NotificationKind, ParticipantRole};
pub use ids::{EventId, ParticipantId};
pub use structs::{Notification, Speaker};
