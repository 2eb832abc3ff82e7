//! Engine tunables loaded from environment variables.

use event_store::Version;

/// Default number of versions between snapshots.
pub const DEFAULT_SNAPSHOT_THRESHOLD: i64 = 50;

/// Default number of attempts for a field update that keeps losing the
/// version race.
pub const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 3;

/// When the replay service should write a new snapshot.
///
/// Reads `PROFILE_SNAPSHOT_THRESHOLD` (default: `50`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    threshold: i64,
}

impl SnapshotPolicy {
    /// Creates a policy that snapshots every `threshold` versions.
    ///
    /// Values below 1 are clamped to 1.
    pub fn every(threshold: i64) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    /// Loads the policy from the environment, falling back to the default.
    pub fn from_env() -> Self {
        std::env::var("PROFILE_SNAPSHOT_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Self::every)
            .unwrap_or_default()
    }

    /// Returns the configured threshold.
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Returns true once the log has grown `threshold` versions past the
    /// state embedded in the latest snapshot.
    pub fn is_due(&self, current: Version, snapshot_version: Version) -> bool {
        current.distance_from(snapshot_version) >= self.threshold
    }
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self::every(DEFAULT_SNAPSHOT_THRESHOLD)
    }
}

/// How often a caller-level workflow retries after a version conflict.
///
/// Reads `PROFILE_MAX_APPEND_ATTEMPTS` (default: `3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` tries (at least one).
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Loads the policy from the environment, falling back to the default.
    pub fn from_env() -> Self {
        std::env::var("PROFILE_MAX_APPEND_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Self::attempts)
            .unwrap_or_default()
    }

    /// Returns the maximum number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::attempts(DEFAULT_MAX_APPEND_ATTEMPTS)
    }
}

/// All engine tunables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub snapshot: SnapshotPolicy,
    pub retry: RetryPolicy,
}

impl EngineConfig {
    /// Loads every tunable from the environment.
    pub fn from_env() -> Self {
        Self {
            snapshot: SnapshotPolicy::from_env(),
            retry: RetryPolicy::from_env(),
        }
    }
}
