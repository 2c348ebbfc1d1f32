// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Monotonic time sources used by the pacer.
//!
//! The pacer never reads wall-clock time. Tick timestamps come from the host's
//! refresh callback, and render durations are measured with a [`MonotonicClock`]
//! in the same timebase.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic nanosecond clock.
///
/// Implementations must never go backwards. The origin is arbitrary but must be
/// shared with whatever produces the tick timestamps passed to the pacer.
pub trait MonotonicClock: Send + Sync + Debug + 'static {
    /// Returns the current time in nanoseconds since the clock's origin.
    fn now_ns(&self) -> u64;
}

/// A clock backed by [`Instant`], counting from the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Converts an [`Instant`] into this clock's timebase.
    ///
    /// Instants taken before the origin saturate to zero.
    pub fn instant_to_ns(&self, instant: Instant) -> u64 {
        instant
            .checked_duration_since(self.origin)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// A clock that only moves when told to.
///
/// Used by deterministic drivers and tests, where tick timestamps are
/// synthesized and render time must be controlled precisely.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    /// Creates a clock starting at `start_ns`.
    pub fn new(start_ns: u64) -> Self {
        Self {
            now_ns: AtomicU64::new(start_ns),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.now_ns
            .fetch_add(delta.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Moves the clock to `now_ns`. Earlier values are ignored.
    pub fn set(&self, now_ns: u64) {
        self.now_ns.fetch_max(now_ns, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now_ns();
        thread::sleep(Duration::from_millis(2));
        let second = clock.now_ns();
        assert!(second > first, "{second} should be after {first}");
    }

    #[test]
    fn system_clock_converts_instants() {
        let clock = SystemClock::new();
        let later = Instant::now() + Duration::from_millis(5);
        assert!(clock.instant_to_ns(later) >= 5_000_000);

        let earlier = Instant::now() - Duration::from_millis(5);
        let before_origin = SystemClock::new();
        assert_eq!(before_origin.instant_to_ns(earlier), 0);
    }

    #[test]
    fn manual_clock_moves_only_forward() {
        let clock = ManualClock::new(100);
        clock.advance(Duration::from_nanos(50));
        assert_eq!(clock.now_ns(), 150);

        clock.set(120);
        assert_eq!(clock.now_ns(), 150, "setting an earlier time must be ignored");

        clock.set(1_000);
        assert_eq!(clock.now_ns(), 1_000);
    }
}
