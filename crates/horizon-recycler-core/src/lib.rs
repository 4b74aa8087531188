//! Core primitives for Horizon Recycler.
//!
//! This crate holds the runtime-agnostic pieces the virtualization engine is
//! assembled from:
//!
//! - **Layout versions**: a strictly increasing token that decides which of
//!   several interleaved layout passes may commit
//! - **Signal/Slot System**: type-safe change notification
//! - **Frame throttle**: coalescing of high-frequency scroll triggers
//! - **Logging**: shared `tracing` targets and helpers
//!
//! # Version Example
//!
//! ```
//! use horizon_recycler_core::VersionClock;
//!
//! let clock = VersionClock::new();
//! let first = clock.stamp();
//! let second = clock.stamp();
//!
//! assert!(second > first);
//! assert!(!clock.is_current(first));
//! assert!(clock.is_current(second));
//! ```
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_recycler_core::Signal;
//!
//! let extent_changed = Signal::<f32>::new();
//! let conn_id = extent_changed.connect(|extent| {
//!     println!("content extent is now {extent}");
//! });
//!
//! extent_changed.emit(1200.0);
//! extent_changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod signal;
pub mod throttle;
pub mod version;

pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use throttle::{FrameThrottle, PassTicket, ThrottleDecision};
pub use version::{LayoutVersion, Outcome, VersionClock};
