//! # Lapse Core
//!
//! Core errors, constants, and the clock abstraction shared by the Lapse crates.
//!
//! - **Errors**: `LapseError` for configuration and scheduling failures
//! - **Constants**: default TTL, sweep cadence, environment variable names
//! - **Traits**: the `Clock` interface that the cache reads time through
//! - **Clocks**: `SystemClock` for production, `ManualClock` for tests and demos
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use lapse_core::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_millis(150));
//! assert_eq!(clock.now() - start, Duration::from_millis(150));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod clock;
pub mod constants;
pub mod error;
pub mod traits;

// Re-export commonly used items at crate root
pub use clock::{ManualClock, SystemClock};
pub use constants::*;
pub use error::{LapseError, Result};
pub use traits::*;
