//! Error types for the snapshot store.
//!
//! Validation failures aggregate every violation found, never just the
//! first. I/O and parse failures are wrapped with the phase and the file
//! they concern and always keep the underlying cause.

use rendezvous_registry::RegistryError;

/// Which side of the codec failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Writing a snapshot.
    Save,
    /// Reading a snapshot.
    Load,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::Load => write!(f, "load"),
        }
    }
}

/// Errors that can occur while saving or loading snapshots.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The data violates one or more structural rules.
    #[error("{}", render_violations(.violations))]
    Validation {
        /// Every violation found, in discovery order.
        violations: Vec<String>,
    },

    /// Reading, writing, or parsing a snapshot failed.
    #[error("{phase} of '{file}' failed: {reason}")]
    Serialization {
        /// Save or load.
        phase: Phase,
        /// The file concerned.
        file: String,
        /// What was being attempted.
        reason: String,
        /// The underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Rebuilding entities from a validated snapshot failed.
    #[error("registry rebuild failed: {0}")]
    Registry(#[from] RegistryError),
}

fn render_violations(violations: &[String]) -> String {
    match violations {
        [single] => format!("validation failed: {single}"),
        many => {
            let mut out = format!("validation failed with {} violations:", many.len());
            for violation in many {
                out.push_str("\n  - ");
                out.push_str(violation);
            }
            out
        }
    }
}

impl StoreError {
    /// Wrap a failure with its phase and file.
    pub fn serialization(
        phase: Phase,
        file: impl Into<String>,
        reason: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Serialization {
            phase,
            file: file.into(),
            reason: reason.into(),
            source: source.into(),
        }
    }

    /// Machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
            Self::Registry(inner) => inner.code(),
        }
    }

    /// Message suitable for showing to an operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { violations } => {
                format!("The data contains {} error(s):\n{self}", violations.len())
            }
            Self::Serialization {
                phase, file, reason, ..
            } => match phase {
                Phase::Save => format!("Could not save '{file}': {reason}"),
                Phase::Load => format!("Could not load '{file}': {reason}"),
            },
            Self::Registry(inner) => inner.user_message(),
        }
    }

    /// The violations, for validation errors.
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Validation { violations } => violations,
            _ => &[],
        }
    }
}
