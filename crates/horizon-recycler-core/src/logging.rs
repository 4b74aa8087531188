//! Logging facilities for Horizon Recycler.
//!
//! Horizon Recycler uses the `tracing` crate for instrumentation and never
//! installs a subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_recycler=debug")
//!     .init();
//! ```
//!
//! Per-item work logs at `trace`, per-pass decisions at `debug`. A superseded
//! pass is an expected outcome and is never logged above `debug`.

/// Span names used throughout Horizon Recycler for tracing.
pub mod span_names {
    /// A complete layout pass (measure and arrange).
    pub const LAYOUT_PASS: &str = "horizon_recycler::layout_pass";
    /// Offset table construction.
    pub const MEASURE: &str = "horizon_recycler::measure";
    /// Slot arrangement.
    pub const ARRANGE: &str = "horizon_recycler::arrange";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_recycler_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_recycler_core::signal";
    /// Frame throttle target.
    pub const THROTTLE: &str = "horizon_recycler_core::throttle";
    /// Version clock target.
    pub const VERSION: &str = "horizon_recycler_core::version";
    /// Size oracle target.
    pub const SIZE_ORACLE: &str = "horizon_recycler::size_oracle";
    /// Offset table target.
    pub const OFFSET_TABLE: &str = "horizon_recycler::offset_table";
    /// Slot recycler target.
    pub const RECYCLER: &str = "horizon_recycler::recycler";
    /// Layout coordinator target.
    pub const COORDINATOR: &str = "horizon_recycler::coordinator";
    /// Collection facade target.
    pub const COLLECTION: &str = "horizon_recycler::collection";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for timing a whole layout pass with a span-aware subscriber.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_recycler::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
