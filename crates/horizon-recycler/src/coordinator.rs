//! Layout pass sequencing.
//!
//! Every trigger stamps a new [`LayoutVersion`] and runs a pass through
//! `Measuring` and `Arranging` back to `Idle`. Passes may interleave at the
//! measurement suspension point; the version decides which one commits.
//!
//! Arrangement is additionally single-flight per collection: a pass that
//! reaches arrangement while another is arranging does not start a second,
//! overlapping arrangement. It leaves a request behind and the running one
//! repeats once under the then-current version.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use horizon_recycler_core::logging::targets;
use horizon_recycler_core::{FrameThrottle, LayoutVersion, PassTicket, ThrottleDecision, VersionClock};

/// What started a layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The item sequence was replaced.
    SourceChanged,
    /// An item's intrinsic size changed.
    ItemResized,
    /// The scroll host moved.
    Scrolled,
    /// The scroll host stopped moving.
    ScrollEnded,
    /// A programmatic scroll to an item or position.
    ScrollRequested,
    /// An explicit re-arrangement under the current offsets.
    Refresh,
}

impl Trigger {
    /// Whether this trigger invalidates measured sizes.
    pub fn remeasures(self) -> bool {
        matches!(self, Self::SourceChanged | Self::ItemResized)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SourceChanged => "source-changed",
            Self::ItemResized => "item-resized",
            Self::Scrolled => "scrolled",
            Self::ScrollEnded => "scroll-ended",
            Self::ScrollRequested => "scroll-requested",
            Self::Refresh => "refresh",
        };
        f.write_str(name)
    }
}

/// Where the collection's newest pass is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayoutPhase {
    #[default]
    Idle,
    Measuring,
    Arranging,
}

/// How a triggered pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The pass committed its layout under this version.
    Committed(LayoutVersion),
    /// A newer trigger superseded the pass; nothing was committed.
    Superseded(LayoutVersion),
    /// Another arrangement was running; it will re-run for this trigger.
    Coalesced,
    /// The frame throttle absorbed the trigger into a pending pass.
    Throttled,
    /// A scroll-driven pass ran past its timeout and was abandoned.
    TimedOut,
    /// Nothing to do: the collection is disposed, or the trigger concerned
    /// an item it does not hold.
    Skipped,
}

impl PassOutcome {
    pub fn is_committed(self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PhaseState {
    phase: LayoutPhase,
    owner: LayoutVersion,
}

/// Version clock, phase tracking, arrangement guard and scroll throttle for
/// one collection.
#[derive(Debug)]
pub struct LayoutCoordinator {
    clock: VersionClock,
    phase: Mutex<PhaseState>,
    arranging: AtomicBool,
    rearrange_requested: AtomicBool,
    throttle: Mutex<FrameThrottle>,
}

impl LayoutCoordinator {
    pub fn new(throttle: FrameThrottle) -> Self {
        Self {
            clock: VersionClock::new(),
            phase: Mutex::new(PhaseState::default()),
            arranging: AtomicBool::new(false),
            rearrange_requested: AtomicBool::new(false),
            throttle: Mutex::new(throttle),
        }
    }

    pub fn clock(&self) -> &VersionClock {
        &self.clock
    }

    pub fn current_version(&self) -> LayoutVersion {
        self.clock.current()
    }

    pub fn is_current(&self, version: LayoutVersion) -> bool {
        self.clock.is_current(version)
    }

    pub fn phase(&self) -> LayoutPhase {
        self.phase.lock().phase
    }

    /// Stamp a version for `trigger` and enter `Measuring`.
    ///
    /// Any pass still in flight becomes stale from this point on.
    pub fn begin_pass(&self, trigger: Trigger) -> LayoutVersion {
        let version = self.clock.stamp();
        *self.phase.lock() = PhaseState {
            phase: LayoutPhase::Measuring,
            owner: version,
        };
        tracing::debug!(target: targets::COORDINATOR, %version, %trigger, "layout pass started");
        version
    }

    /// Stamp a version that belongs to no pass, cancelling everything in flight.
    pub fn invalidate(&self) -> LayoutVersion {
        let version = self.clock.stamp();
        *self.phase.lock() = PhaseState {
            phase: LayoutPhase::Idle,
            owner: version,
        };
        version
    }

    /// Move the pass owning `version` into `Arranging`.
    pub fn enter_arranging(&self, version: LayoutVersion) {
        let mut state = self.phase.lock();
        state.phase = LayoutPhase::Arranging;
        state.owner = version;
    }

    /// Guard that calls [`finish_pass`](Self::finish_pass) when dropped, so a
    /// pass abandoned mid-flight still releases its phase.
    pub fn pass_guard(&self, version: LayoutVersion) -> PassGuard<'_> {
        PassGuard {
            coordinator: self,
            version,
        }
    }

    /// Return to `Idle` if `version` still owns the phase.
    ///
    /// A stale pass finishing late leaves the newer pass's phase alone.
    pub fn finish_pass(&self, version: LayoutVersion) {
        let mut state = self.phase.lock();
        if state.owner == version {
            state.phase = LayoutPhase::Idle;
        }
    }

    /// Enter the single-flight arrangement section.
    ///
    /// Returns `None` when another arrangement is running; the request is then
    /// recorded and the running arrangement repeats once it finishes.
    pub fn try_arrange(&self) -> Option<ArrangeGuard<'_>> {
        if self.arranging.swap(true, Ordering::AcqRel) {
            self.rearrange_requested.store(true, Ordering::Release);
            tracing::trace!(target: targets::COORDINATOR, "arrangement busy, request coalesced");
            return None;
        }
        Some(ArrangeGuard { coordinator: self })
    }

    pub fn is_arranging(&self) -> bool {
        self.arranging.load(Ordering::Acquire)
    }

    // Throttle -------------------------------------------------------------

    pub fn throttle_request(&self, now: Instant) -> ThrottleDecision {
        self.throttle.lock().request(now)
    }

    pub fn throttle_force(&self, now: Instant) -> ThrottleDecision {
        self.throttle.lock().force(now)
    }

    pub fn throttle_begin(&self, now: Instant) -> PassTicket {
        self.throttle.lock().begin(now)
    }

    pub fn throttle_finish(&self, ticket: PassTicket) {
        self.throttle.lock().finish(ticket);
    }

    pub fn throttle_clear_deferred(&self) {
        self.throttle.lock().clear_deferred();
    }
}

/// Returns the owning pass to `Idle` on drop.
pub struct PassGuard<'a> {
    coordinator: &'a LayoutCoordinator,
    version: LayoutVersion,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.finish_pass(self.version);
    }
}

/// Held while an arrangement runs; releases the section on drop.
pub struct ArrangeGuard<'a> {
    coordinator: &'a LayoutCoordinator,
}

impl ArrangeGuard<'_> {
    /// Consume a pending re-arrangement request, if one arrived.
    pub fn take_rerun(&self) -> bool {
        self.coordinator.rearrange_requested.swap(false, Ordering::AcqRel)
    }
}

impl Drop for ArrangeGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.arranging.store(false, Ordering::Release);
    }
}

static_assertions::assert_impl_all!(LayoutCoordinator: Send, Sync);
