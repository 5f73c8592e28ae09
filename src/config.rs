//! # Store Configuration
//!
//! The database location is always supplied by the caller; the store never
//! derives a path from its own install location or working directory.

use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default capacity of the owner's request queue.
///
/// Sensors report every few seconds and each request takes well under a
/// millisecond, so the queue only fills if the owner is stalled on disk.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default time `shutdown` waits for the owner thread to exit.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Types
// =============================================================================

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    /// Private in-memory database, discarded at shutdown. Used by tests.
    InMemory,
}

/// Configuration for a store and its owner thread.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub location: DbLocation,
    /// Bound of the request queue. Producers block when it is full.
    pub channel_capacity: usize,
    /// How long `shutdown` waits for the owner to drain and exit before
    /// detaching it.
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Configuration for a database file, created if missing.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_location(DbLocation::File(path.into()))
    }

    /// Configuration for a throwaway in-memory database.
    pub fn in_memory() -> Self {
        Self::with_location(DbLocation::InMemory)
    }

    fn with_location(location: DbLocation) -> Self {
        Self {
            location,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
