//! Store settings and format constants.

/// Format version written by this crate: events reference participants by id.
pub const FORMAT_VERSION: &str = "1.1";

/// Older format: events embed full participant objects.
pub const LEGACY_FORMAT_VERSION: &str = "1.0";

/// Default upper bound on snapshot file size (100 megabytes).
pub const DEFAULT_MAX_SNAPSHOT_BYTES: u64 = 104_857_600;

/// How far in the future, in seconds, a snapshot's `savedAt` may lie
/// before it is rejected.
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Settings for the snapshot codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Written as `appVersion` in every snapshot.
    pub app_version: String,
    /// Files larger than this are refused on load.
    pub max_snapshot_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_owned(),
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
        }
    }
}
