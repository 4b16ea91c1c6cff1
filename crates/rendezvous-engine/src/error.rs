//! Error types for the engine binary.

use rendezvous_registry::RegistryError;
use rendezvous_store::StoreError;

use crate::config::ConfigError;

/// Top-level error for the engine binary.
///
/// Each variant wraps a crate error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A registry operation failed.
    #[error("registry error: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: RegistryError,
    },

    /// Saving or loading a snapshot failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// Sample data or the observer demonstration could not be built.
    #[error("demo error: {message}")]
    Demo {
        /// Description of the failure.
        message: String,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
