//! Defaults and environment variable names for Lapse.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// EXPIRATION DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default time-to-live in seconds for entries inserted without an explicit TTL.
pub const DEFAULT_TTL_SECONDS: u64 = 300;

/// Default time-to-live as a `Duration` (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(DEFAULT_TTL_SECONDS);

/// Default interval in seconds between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Default number of slots to pre-allocate in the entry map.
/// Zero means the map grows on demand.
pub const DEFAULT_INITIAL_CAPACITY: usize = 0;

/// Distance used in place of an instant that would overflow the clock.
/// Roughly 30 years: an entry with this lifetime never expires in practice.
pub const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT OVERRIDES
// ═══════════════════════════════════════════════════════════════════════════════

/// Overrides `default_ttl_seconds`.
pub const ENV_DEFAULT_TTL_SECS: &str = "LAPSE_DEFAULT_TTL_SECS";

/// Overrides `initial_capacity`.
pub const ENV_INITIAL_CAPACITY: &str = "LAPSE_INITIAL_CAPACITY";

/// Overrides `sweep_interval_seconds`.
pub const ENV_SWEEP_INTERVAL_SECS: &str = "LAPSE_SWEEP_INTERVAL_SECS";
