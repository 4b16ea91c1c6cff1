//! Engine binary for the Rendezvous event registry.
//!
//! Loads configuration, restores the registry from its snapshot (or seeds
//! sample data on a first run), runs the observer demonstration, prints
//! the registry statistics, and saves the registry back before exiting.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `rendezvous-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Restore the registry from the configured snapshot
//! 4. Seed sample data when the registry is empty
//! 5. Run the observer demonstration
//! 6. Print registry statistics
//! 7. Save the snapshot

mod config;
mod demo;
mod error;

use std::path::Path;

use rendezvous_registry::EventRegistry;
use rendezvous_store::SnapshotCodec;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{EngineConfig, LoggingConfig};
use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "rendezvous-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the snapshot lifecycle
/// fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = Path::new(CONFIG_FILE);
    let config_found = config_path.exists();
    let config = load_config(config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        app = %config.app.name,
        version = %config.app.version,
        "rendezvous-engine starting"
    );
    if !config_found {
        info!("Config file not found, using defaults");
    }

    // 3. Restore the registry.
    let codec = SnapshotCodec::new(config.store_config());
    let registry = EventRegistry::new();
    let snapshot_path = Path::new(&config.storage.snapshot_path);
    if config.storage.load_on_start && snapshot_path.exists() {
        let loaded = codec.load_into(&registry, snapshot_path).map_err(EngineError::from)?;
        for warning in &loaded.warnings {
            warn!(file = %snapshot_path.display(), %warning, "Snapshot loaded with warning");
        }
        info!(
            file = %snapshot_path.display(),
            events = registry.event_count(),
            participants = registry.participant_count(),
            subscriptions = loaded.subscriptions,
            saved_at = %loaded.saved_at,
            "Registry restored"
        );
    }

    // 4. Seed sample data.
    demo::seed(&registry)?;

    // 5. Observer demonstration.
    if config.demo.enabled {
        let report = demo::run_observer_demo()?;
        info!(
            event_id = %report.event,
            notified = report.cancelled_deliveries,
            "Demo event deleted after cancelling"
        );
        for member in &report.members {
            let kinds: Vec<String> = member.received.iter().map(ToString::to_string).collect();
            info!(
                event_id = %report.event,
                participant_id = %member.participant,
                received = %kinds.join(", "),
                "Demo member inbox"
            );
        }
    }

    // 6. Print statistics.
    let stats = registry.stats();
    println!("{stats}");

    // 7. Save the snapshot.
    if config.storage.save_on_exit {
        codec
            .save_registry(&registry, snapshot_path)
            .map_err(EngineError::from)?;
    }

    info!("rendezvous-engine finished");
    Ok(())
}

/// Load configuration, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    if path.exists() {
        Ok(EngineConfig::from_file(path)?)
    } else {
        let mut config = EngineConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
