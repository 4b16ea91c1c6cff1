//! Saving and loading registry snapshots.
//!
//! # Save
//!
//! 1. Capture every entity into a [`SnapshotDocument`] (one consistent
//!    view per event).
//! 2. Validate the document; nothing unloadable is ever written.
//! 3. Write `<file>.tmp`, then rename it over the destination, so a failed
//!    write never leaves a partial file behind.
//!
//! # Load
//!
//! 1. Check the file exists, is a regular file, is non-empty, and is below
//!    the configured size ceiling.
//! 2. Parse and validate, collecting every violation.
//! 3. Rebuild participants, then events (resolving roster ids against the
//!    canonical participant list).
//! 4. Reconstruct every event's subscriber list from its roster. This step
//!    is unconditional: subscriptions are never persisted.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rendezvous_registry::{Event, EventRegistry, Participant, RegistryStats};
use rendezvous_types::ParticipantId;
use serde::Deserialize;
use serde::de::IgnoredAny;
use tracing::{info, warn};

use crate::config::{FORMAT_VERSION, LEGACY_FORMAT_VERSION, StoreConfig};
use crate::error::{Phase, StoreError};
use crate::records::{EventRecord, ParticipantRecord, SnapshotDocument, SnapshotStats};
use crate::validation;

/// Entities rebuilt from a snapshot, with its metadata.
#[derive(Debug)]
pub struct LoadedSnapshot {
    /// Rebuilt events, subscriptions reconstructed.
    pub events: Vec<Arc<Event>>,
    /// Rebuilt participants (the canonical instances).
    pub participants: Vec<Arc<Participant>>,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
    /// Version of the writing application.
    pub app_version: String,
    /// Format version found in the file.
    pub format_version: String,
    /// Comment stored with the snapshot.
    pub comment: String,
    /// Subscriptions registered during reconstruction.
    pub subscriptions: usize,
    /// Non-fatal findings (unknown format version, implausible totals).
    pub warnings: Vec<String>,
}

/// Snapshot metadata, read without rebuilding any entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
    /// Version of the writing application.
    pub app_version: String,
    /// Format version.
    pub format_version: String,
    /// Number of events.
    pub event_count: usize,
    /// Number of participants.
    pub participant_count: usize,
    /// Subscriber total recorded at save.
    pub total_subscribers_at_save: u64,
    /// Stored comment.
    pub comment: String,
    /// File size in bytes.
    pub size_bytes: u64,
}

/// The parts of a document [`SnapshotCodec::inspect`] needs.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotHeader {
    events: Vec<IgnoredAny>,
    participants: Vec<IgnoredAny>,
    saved_at: DateTime<Utc>,
    app_version: String,
    format_version: String,
    #[serde(default)]
    total_subscribers_at_save: u64,
    #[serde(default)]
    comment: String,
}

/// Reads and writes registry snapshots as JSON files.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCodec {
    config: StoreConfig,
}

fn file_label(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl SnapshotCodec {
    /// Create a codec with the given settings.
    pub const fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// The codec's settings.
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /// Capture entities into a document.
    ///
    /// Without a comment, an automatic one summarizing the counts is used.
    pub fn document(
        &self,
        events: &[Arc<Event>],
        participants: &[Arc<Participant>],
        comment: Option<&str>,
    ) -> SnapshotDocument {
        let stats = RegistryStats::compute(events, participants);
        let comment = comment.map_or_else(
            || {
                format!(
                    "Automatic save - {} events, {} participants, {} subscriptions",
                    stats.event_count, stats.participant_count, stats.total_subscribers
                )
            },
            ToOwned::to_owned,
        );
        SnapshotDocument {
            events: events.iter().map(|e| EventRecord::from_event(e)).collect(),
            participants: participants
                .iter()
                .map(|p| ParticipantRecord::from_participant(p))
                .collect(),
            saved_at: Utc::now(),
            app_version: self.config.app_version.clone(),
            format_version: FORMAT_VERSION.to_owned(),
            total_subscribers_at_save: stats.total_subscribers,
            comment,
            stats: Some(SnapshotStats::from(&stats)),
        }
    }

    /// Pretty JSON for the given entities, without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if encoding fails.
    pub fn export_json(
        &self,
        events: &[Arc<Event>],
        participants: &[Arc<Participant>],
    ) -> Result<String, StoreError> {
        let doc = self.document(events, participants, None);
        serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::serialization(Phase::Save, "<export>", "encoding failed", e))
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Validate and atomically write a snapshot with an automatic comment.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] lists every rule the data breaks;
    /// [`StoreError::Serialization`] wraps encoding and I/O failures.
    pub fn save(
        &self,
        events: &[Arc<Event>],
        participants: &[Arc<Participant>],
        path: &Path,
    ) -> Result<SnapshotDocument, StoreError> {
        Self::write(self.document(events, participants, None), path)
    }

    /// Like [`save`](Self::save), with an explicit comment.
    pub fn save_with_comment(
        &self,
        events: &[Arc<Event>],
        participants: &[Arc<Participant>],
        path: &Path,
        comment: &str,
    ) -> Result<SnapshotDocument, StoreError> {
        Self::write(self.document(events, participants, Some(comment)), path)
    }

    /// Save the whole registry.
    pub fn save_registry(
        &self,
        registry: &EventRegistry,
        path: &Path,
    ) -> Result<SnapshotDocument, StoreError> {
        self.save(&registry.events(), &registry.participants(), path)
    }

    /// Save into `dir` as `snapshot_YYYYMMDD_HHMMSS.json`, creating the
    /// directory if needed. Returns the written path.
    pub fn save_timestamped(
        &self,
        events: &[Arc<Event>],
        participants: &[Arc<Participant>],
        dir: &Path,
    ) -> Result<PathBuf, StoreError> {
        let name = format!("snapshot_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);
        self.save(events, participants, &path)?;
        Ok(path)
    }

    fn write(doc: SnapshotDocument, path: &Path) -> Result<SnapshotDocument, StoreError> {
        let file = file_label(path);
        let violations = validation::violations(&doc, Utc::now());
        if !violations.is_empty() {
            warn!(file = %file, violations = violations.len(), "Refusing to save invalid data");
            return Err(StoreError::Validation { violations });
        }

        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::serialization(Phase::Save, &file, "encoding failed", e))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::serialization(Phase::Save, &file, "cannot create directory", e)
            })?;
        }

        let tmp = temp_path(path);
        fs::write(&tmp, json.as_bytes()).map_err(|e| {
            StoreError::serialization(Phase::Save, &file, "cannot write temporary file", e)
        })?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::serialization(
                Phase::Save,
                &file,
                "cannot replace destination",
                e,
            ));
        }

        info!(
            file = %file,
            events = doc.events.len(),
            participants = doc.participants.len(),
            subscribers = doc.total_subscribers_at_save,
            "Snapshot saved"
        );
        Ok(doc)
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Check that `path` is a readable, non-empty file within the size
    /// ceiling. Returns its size.
    fn check_file(&self, path: &Path, file: &str) -> Result<u64, StoreError> {
        let meta = fs::metadata(path)
            .map_err(|e| StoreError::serialization(Phase::Load, file, "file does not exist", e))?;
        if !meta.is_file() {
            return Err(StoreError::serialization(
                Phase::Load,
                file,
                "path is not a regular file",
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        if meta.len() == 0 {
            return Err(StoreError::serialization(
                Phase::Load,
                file,
                "file is empty",
                io::Error::new(io::ErrorKind::UnexpectedEof, "empty file"),
            ));
        }
        if meta.len() > self.config.max_snapshot_bytes {
            return Err(StoreError::serialization(
                Phase::Load,
                file,
                format!(
                    "file is too large ({} bytes, limit {})",
                    meta.len(),
                    self.config.max_snapshot_bytes
                ),
                io::Error::new(io::ErrorKind::InvalidData, "snapshot too large"),
            ));
        }
        Ok(meta.len())
    }

    fn read(&self, path: &Path, file: &str) -> Result<(String, u64), StoreError> {
        let size = self.check_file(path, file)?;
        let text = fs::read_to_string(path)
            .map_err(|e| StoreError::serialization(Phase::Load, file, "cannot read file", e))?;
        Ok((text, size))
    }

    /// Load, validate, and rebuild a snapshot.
    ///
    /// # Errors
    ///
    /// [`StoreError::Serialization`] for file and parse failures,
    /// [`StoreError::Validation`] listing every structural violation.
    pub fn load(&self, path: &Path) -> Result<LoadedSnapshot, StoreError> {
        let file = file_label(path);
        let (text, _) = self.read(path, &file)?;
        let loaded = self.parse(&text, &file)?;
        info!(
            file = %file,
            events = loaded.events.len(),
            participants = loaded.participants.len(),
            subscriptions = loaded.subscriptions,
            format_version = %loaded.format_version,
            "Snapshot loaded"
        );
        Ok(loaded)
    }

    /// Load a snapshot and swap it into the registry.
    ///
    /// The registry is untouched if loading fails.
    pub fn load_into(&self, registry: &EventRegistry, path: &Path) -> Result<LoadedSnapshot, StoreError> {
        let loaded = self.load(path)?;
        registry.replace_all(loaded.events.clone(), loaded.participants.clone())?;
        Ok(loaded)
    }

    /// Parse and rebuild a snapshot from JSON text.
    ///
    /// `file` only labels errors. The text is held to the same size ceiling
    /// as files.
    pub fn parse(&self, json: &str, file: &str) -> Result<LoadedSnapshot, StoreError> {
        let size = u64::try_from(json.len()).unwrap_or(u64::MAX);
        if size > self.config.max_snapshot_bytes {
            return Err(StoreError::serialization(
                Phase::Load,
                file,
                format!(
                    "snapshot is too large ({size} bytes, limit {})",
                    self.config.max_snapshot_bytes
                ),
                io::Error::new(io::ErrorKind::InvalidData, "snapshot too large"),
            ));
        }
        let doc: SnapshotDocument = serde_json::from_str(json)
            .map_err(|e| StoreError::serialization(Phase::Load, file, "invalid snapshot JSON", e))?;
        Self::rebuild(doc, file)
    }

    fn rebuild(doc: SnapshotDocument, file: &str) -> Result<LoadedSnapshot, StoreError> {
        let violations = validation::violations(&doc, Utc::now());
        if !violations.is_empty() {
            warn!(file = %file, violations = violations.len(), "Snapshot failed validation");
            return Err(StoreError::Validation { violations });
        }

        let mut warnings = Vec::new();
        if doc.format_version != FORMAT_VERSION && doc.format_version != LEGACY_FORMAT_VERSION {
            warn!(file = %file, format_version = %doc.format_version, "Unknown snapshot format version");
            warnings.push(format!(
                "unknown format version '{}', read as {FORMAT_VERSION}",
                doc.format_version
            ));
        }
        if !validation::subscriber_total_is_plausible(&doc) {
            warn!(
                file = %file,
                recorded = doc.total_subscribers_at_save,
                "Recorded subscriber total does not match rosters"
            );
            warnings.push(format!(
                "totalSubscribersAtSave is {} but rosters hold {} enrollments",
                doc.total_subscribers_at_save,
                validation::total_enrollments(&doc)
            ));
        }

        let participants: Vec<Arc<Participant>> = doc
            .participants
            .iter()
            .map(|record| Arc::new(record.to_participant()))
            .collect();
        let by_id: HashMap<&ParticipantId, &Arc<Participant>> =
            participants.iter().map(|p| (p.id(), p)).collect();

        let mut events = Vec::with_capacity(doc.events.len());
        for record in &doc.events {
            let roster = record
                .participants
                .iter()
                .filter_map(|entry| by_id.get(entry.id()).map(|p| Arc::clone(p)))
                .collect();
            let event = Event::restore(record.params(), record.details(), record.cancelled, roster)?;
            events.push(Arc::new(event));
        }

        let subscriptions = events
            .iter()
            .map(|e| e.reconstruct_subscriptions())
            .fold(0_usize, usize::saturating_add);

        Ok(LoadedSnapshot {
            events,
            participants,
            saved_at: doc.saved_at,
            app_version: doc.app_version,
            format_version: doc.format_version,
            comment: doc.comment,
            subscriptions,
            warnings,
        })
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Read a snapshot's metadata without rebuilding entities.
    ///
    /// # Errors
    ///
    /// [`StoreError::Serialization`] for file and parse failures.
    pub fn inspect(&self, path: &Path) -> Result<SnapshotInfo, StoreError> {
        let file = file_label(path);
        let (text, size_bytes) = self.read(path, &file)?;
        let header: SnapshotHeader = serde_json::from_str(&text)
            .map_err(|e| StoreError::serialization(Phase::Load, &file, "invalid snapshot JSON", e))?;
        Ok(SnapshotInfo {
            saved_at: header.saved_at,
            app_version: header.app_version,
            format_version: header.format_version,
            event_count: header.events.len(),
            participant_count: header.participants.len(),
            total_subscribers_at_save: header.total_subscribers_at_save,
            comment: header.comment,
            size_bytes,
        })
    }

    /// Whether the file passes the pre-load checks and parses as a
    /// snapshot header.
    pub fn is_valid_snapshot(&self, path: &Path) -> bool {
        self.inspect(path).is_ok()
    }
}
