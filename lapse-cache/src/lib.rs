//! # Lapse Cache
//!
//! Generic in-memory cache with per-entry expiration.
//!
//! - **Passive eviction**: `get` never returns a stale value
//! - **Active eviction**: `prune` physically removes stale entries
//! - **Sweeper**: optional Tokio task that calls `prune` on an interval
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use lapse_cache::TtlCache;
//!
//! let cache: TtlCache<String, u32> = TtlCache::new();
//! cache.set_with_ttl("answer".to_string(), 42, Duration::from_secs(60));
//! assert_eq!(cache.get("answer"), Some(42));
//!
//! cache.set_with_ttl("gone".to_string(), 7, Duration::ZERO);
//! assert_eq!(cache.get("gone"), None);
//! assert_eq!(cache.prune(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod config;
mod stats;
mod sweeper;

pub use cache::TtlCache;
pub use config::CacheConfig;
pub use stats::CacheStats;
pub use sweeper::{SweepReport, Sweeper, SweeperHandle};

// Re-export the clock types so callers need only this crate
pub use lapse_core::{Clock, LapseError, ManualClock, SystemClock};
