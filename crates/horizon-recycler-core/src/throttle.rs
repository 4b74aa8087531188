//! Frame throttling for scroll-driven layout passes.
//!
//! Scroll hosts report position changes far more often than a layout pass can
//! usefully run. [`FrameThrottle`] admits at most one pass per frame interval:
//! the first request in an interval runs, a request that arrives too soon is
//! deferred to the end of the interval, and everything after that is absorbed
//! until the deferred pass has run. A scroll-end request bypasses the spacing
//! and only waits for a pass that is still in flight.
//!
//! The throttle never reads the clock itself. Callers pass `now`, which keeps
//! the policy deterministic under test and lets async callers use their
//! runtime's clock.
//!
//! A pass that is in flight for longer than the configured timeout is treated
//! as wedged: its guard is cleared so later requests are not blocked forever.

use std::time::{Duration, Instant};

use crate::logging::targets;

/// Default spacing between scroll-driven passes (one display frame).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Default time after which an in-flight pass is considered wedged.
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(1);

/// What a caller should do with a pass request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Run the pass immediately.
    RunNow,
    /// Wait for the given delay, then run the pass.
    RunAfter(Duration),
    /// Drop the request; a pending or running pass will cover it.
    Coalesced,
}

/// Identifies one admitted pass so that only its owner can finish it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassTicket(u64);

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: PassTicket,
    started: Instant,
}

/// Coalesces scroll triggers into at most one pass per frame interval.
#[derive(Debug)]
pub struct FrameThrottle {
    interval: Duration,
    timeout: Duration,
    last_started: Option<Instant>,
    in_flight: Option<InFlight>,
    deferred: bool,
    next_ticket: u64,
}

impl Default for FrameThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL, DEFAULT_PASS_TIMEOUT)
    }
}

impl FrameThrottle {
    /// Create a throttle with the given frame interval and wedge timeout.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            last_started: None,
            in_flight: None,
            deferred: false,
            next_ticket: 0,
        }
    }

    /// The minimum spacing between admitted passes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long a pass may stay in flight before it is considered wedged.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a pass is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether a trailing pass has been promised to an earlier request.
    pub fn has_deferred(&self) -> bool {
        self.deferred
    }

    /// Ask to run a throttled pass at `now`.
    pub fn request(&mut self, now: Instant) -> ThrottleDecision {
        self.recover_if_wedged(now);

        if self.in_flight.is_some() || self.deferred {
            tracing::trace!(target: targets::THROTTLE, "pass request coalesced");
            return ThrottleDecision::Coalesced;
        }

        match self.last_started {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                let wait = self.interval - now.saturating_duration_since(last);
                self.deferred = true;
                tracing::trace!(target: targets::THROTTLE, wait_us = wait.as_micros() as u64, "pass deferred");
                ThrottleDecision::RunAfter(wait)
            }
            _ => ThrottleDecision::RunNow,
        }
    }

    /// Ask to run an unthrottled pass at `now`, as on scroll end.
    ///
    /// Spacing is ignored. If a pass is still in flight the caller is told to
    /// wait one frame and ask again; the wedge timeout bounds that wait.
    pub fn force(&mut self, now: Instant) -> ThrottleDecision {
        self.recover_if_wedged(now);

        if self.in_flight.is_some() {
            ThrottleDecision::RunAfter(self.interval)
        } else {
            ThrottleDecision::RunNow
        }
    }

    /// Mark a pass as started at `now`.
    pub fn begin(&mut self, now: Instant) -> PassTicket {
        self.next_ticket += 1;
        let ticket = PassTicket(self.next_ticket);
        self.in_flight = Some(InFlight { ticket, started: now });
        self.last_started = Some(now);
        ticket
    }

    /// Mark the pass identified by `ticket` as finished.
    ///
    /// Returns `false` if the guard had already been cleared, either by wedge
    /// recovery or because a newer pass took over.
    pub fn finish(&mut self, ticket: PassTicket) -> bool {
        match self.in_flight {
            Some(flight) if flight.ticket == ticket => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    /// Release the trailing-pass promise once the deferred delay has elapsed.
    pub fn clear_deferred(&mut self) {
        self.deferred = false;
    }

    /// Clear the in-flight guard if it has exceeded the timeout.
    ///
    /// Returns `true` if a wedged pass was cleared.
    pub fn recover_if_wedged(&mut self, now: Instant) -> bool {
        match self.in_flight {
            Some(flight) if now.saturating_duration_since(flight.started) >= self.timeout => {
                tracing::debug!(
                    target: targets::THROTTLE,
                    elapsed_ms = now.saturating_duration_since(flight.started).as_millis() as u64,
                    "clearing wedged pass guard"
                );
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }
}

static_assertions::assert_impl_all!(FrameThrottle: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_request_runs() {
        let mut throttle = FrameThrottle::default();
        assert_eq!(throttle.request(Instant::now()), ThrottleDecision::RunNow);
    }

    #[test]
    fn test_request_within_interval_is_deferred_then_coalesced() {
        let t0 = Instant::now();
        let mut throttle = FrameThrottle::new(ms(16), ms(1000));

        let ticket = throttle.begin(t0);
        assert!(throttle.finish(ticket));

        assert_eq!(throttle.request(t0 + ms(6)), ThrottleDecision::RunAfter(ms(10)));
        assert!(throttle.has_deferred());
        assert_eq!(throttle.request(t0 + ms(8)), ThrottleDecision::Coalesced);

        throttle.clear_deferred();
        assert_eq!(throttle.request(t0 + ms(20)), ThrottleDecision::RunNow);
    }

    #[test]
    fn test_request_while_in_flight_is_coalesced() {
        let t0 = Instant::now();
        let mut throttle = FrameThrottle::new(ms(16), ms(1000));

        let ticket = throttle.begin(t0);
        assert_eq!(throttle.request(t0 + ms(40)), ThrottleDecision::Coalesced);
        throttle.finish(ticket);
        assert_eq!(throttle.request(t0 + ms(41)), ThrottleDecision::RunNow);
    }

    #[test]
    fn test_force_ignores_spacing_but_waits_for_in_flight() {
        let t0 = Instant::now();
        let mut throttle = FrameThrottle::new(ms(16), ms(1000));

        let ticket = throttle.begin(t0);
        assert_eq!(throttle.force(t0 + ms(1)), ThrottleDecision::RunAfter(ms(16)));
        throttle.finish(ticket);
        assert_eq!(throttle.force(t0 + ms(2)), ThrottleDecision::RunNow);
    }

    #[test]
    fn test_wedged_pass_is_cleared() {
        let t0 = Instant::now();
        let mut throttle = FrameThrottle::new(ms(16), ms(1000));

        let stuck = throttle.begin(t0);
        assert_eq!(throttle.request(t0 + ms(500)), ThrottleDecision::Coalesced);
        assert_eq!(throttle.request(t0 + ms(1000)), ThrottleDecision::RunNow);
        assert!(!throttle.is_in_flight());

        // The abandoned pass finishing late must not clear a newer guard.
        let fresh = throttle.begin(t0 + ms(1001));
        assert!(!throttle.finish(stuck));
        assert!(throttle.is_in_flight());
        assert!(throttle.finish(fresh));
    }
}
