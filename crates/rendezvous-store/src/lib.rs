//! JSON snapshot persistence for the Rendezvous registry.
//!
//! A snapshot holds every event and participant plus save-time metadata.
//! Subscriptions are deliberately absent: loading rebuilds them from each
//! event's roster, so a round trip restores exactly the subscriber sets
//! that membership implies.
//!
//! # Modules
//!
//! - [`codec`] -- Atomic save, validated load, inspection ([`SnapshotCodec`])
//! - [`config`] -- Codec settings and format constants ([`StoreConfig`])
//! - [`error`] -- Validation and serialization failures ([`StoreError`])
//! - [`records`] -- The serde shape of the document ([`SnapshotDocument`])
//! - [`validation`] -- Structural rules shared by save and load

pub mod codec;
pub mod config;
pub mod error;
pub mod records;
pub mod validation;

pub use codec::{LoadedSnapshot, SnapshotCodec, SnapshotInfo};
pub use config::{
    DEFAULT_MAX_SNAPSHOT_BYTES, FORMAT_VERSION, LEGACY_FORMAT_VERSION, MAX_CLOCK_SKEW_SECS,
    StoreConfig,
};
pub use error::{Phase, StoreError};
pub use records::{
    EnrolledRef, EventKindRecord, EventRecord, ParticipantRecord, SnapshotDocument, SnapshotStats,
};
