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

//! Refresh-rate arithmetic shared by the pacer and its consumers.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// Number of nanoseconds in one second.
pub const ONE_SECOND_NS: u64 = 1_000_000_000;

/// Number of nanoseconds in one millisecond.
pub const ONE_MILLISECOND_NS: u64 = 1_000_000;

/// A strictly positive refresh rate, in Hertz.
///
/// A zero rate cannot be represented, so code holding a `RefreshRate` never has
/// to guard the period computation against a zero divisor. An "unset" rate is
/// modelled as `Option<RefreshRate>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefreshRate(NonZeroU32);

impl RefreshRate {
    /// Creates a refresh rate, returning `None` for zero.
    pub fn new(hz: u32) -> Option<Self> {
        NonZeroU32::new(hz).map(Self)
    }

    /// Returns the rate in Hertz.
    #[inline]
    pub fn hz(self) -> u32 {
        self.0.get()
    }

    /// Returns the duration of one refresh period in nanoseconds.
    #[inline]
    pub fn period_ns(self) -> u64 {
        ONE_SECOND_NS / u64::from(self.hz())
    }

    /// Returns the duration of one refresh period.
    pub fn period(self) -> Duration {
        Duration::from_nanos(self.period_ns())
    }

    /// Returns `self / other` as a floating-point ratio.
    pub fn ratio_to(self, other: RefreshRate) -> f64 {
        f64::from(self.hz()) / f64::from(other.hz())
    }
}

impl fmt::Display for RefreshRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

impl From<NonZeroU32> for RefreshRate {
    fn from(value: NonZeroU32) -> Self {
        Self(value)
    }
}
