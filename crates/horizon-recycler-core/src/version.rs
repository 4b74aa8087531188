//! Layout versions and the clock that stamps them.
//!
//! Every layout trigger stamps a fresh [`LayoutVersion`]. A pass remembers the
//! version it started under and re-checks it at each checkpoint; once a newer
//! version has been stamped the pass is stale and must stop without touching
//! committed state. Staleness is reported through [`Outcome::Superseded`], not
//! through an error type, because it is the expected result of interleaving.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging::targets;

/// An opaque, strictly increasing layout token.
///
/// Versions from the same [`VersionClock`] are totally ordered; a later stamp
/// always compares greater than every earlier one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayoutVersion(u64);

impl LayoutVersion {
    /// The version held by a clock that has never stamped.
    pub const INITIAL: Self = Self(0);

    /// The raw counter value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayoutVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Issues layout versions and answers whether a version is still current.
///
/// Exactly one version is current at any time: the most recently stamped one.
#[derive(Debug, Default)]
pub struct VersionClock {
    current: AtomicU64,
}

impl VersionClock {
    /// Create a clock whose current version is [`LayoutVersion::INITIAL`].
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// Stamp a new version, superseding every version issued before it.
    pub fn stamp(&self) -> LayoutVersion {
        let next = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(target: targets::VERSION, version = next, "stamped layout version");
        LayoutVersion(next)
    }

    /// The version that is currently allowed to commit.
    #[inline]
    pub fn current(&self) -> LayoutVersion {
        LayoutVersion(self.current.load(Ordering::Acquire))
    }

    /// Whether `version` is still the current one.
    #[inline]
    pub fn is_current(&self, version: LayoutVersion) -> bool {
        self.current() == version
    }

    /// Checkpoint helper: `Some(())` while `version` is current.
    ///
    /// Designed for use inside functions returning [`Outcome`]:
    ///
    /// ```
    /// use horizon_recycler_core::{LayoutVersion, Outcome, VersionClock};
    ///
    /// fn step(clock: &VersionClock, version: LayoutVersion) -> Outcome<u32> {
    ///     if clock.checkpoint(version).is_none() {
    ///         return Outcome::Superseded(version);
    ///     }
    ///     Outcome::Current(7)
    /// }
    ///
    /// let clock = VersionClock::new();
    /// let v = clock.stamp();
    /// assert_eq!(step(&clock, v), Outcome::Current(7));
    /// clock.stamp();
    /// assert!(step(&clock, v).is_superseded());
    /// ```
    #[inline]
    pub fn checkpoint(&self, version: LayoutVersion) -> Option<()> {
        self.is_current(version).then_some(())
    }
}

/// The result of a version-checked phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The phase ran to completion under a version that was still current.
    Current(T),
    /// A newer version was stamped; the phase stopped at a checkpoint and
    /// discarded its partial work. Carries the version the phase ran under.
    Superseded(LayoutVersion),
}

impl<T> Outcome<T> {
    /// Whether the phase was superseded.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded(_))
    }

    /// The completed value, if the phase was not superseded.
    pub fn current(self) -> Option<T> {
        match self {
            Self::Current(value) => Some(value),
            Self::Superseded(_) => None,
        }
    }
}

static_assertions::assert_impl_all!(VersionClock: Send, Sync);
