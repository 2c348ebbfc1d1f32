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

//! The listener contract for FPS measurements.

use std::time::Duration;

/// Which path produced a [`FrameReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushTrigger {
    /// Roughly one second of refresh ticks was observed.
    Periodic,
    /// Rendering went idle and the deferred flush fired with partial counts.
    Idle,
}

/// A single FPS measurement, produced once per measurement window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Measured frames per second: `(1 - skips / ticks) * device_rate`.
    pub fps: f64,
    /// Refresh ticks observed in the window, including inferred missed ones.
    pub ticks: u32,
    /// Ticks that did not produce a frame, either missed by the driver or
    /// skipped by pacing.
    pub skips: u32,
    /// Ticks for which rendering was allowed.
    pub rendered: u32,
    /// Mean duration between `pre_render` and `post_render` over the window.
    pub average_render_time: Duration,
    /// The device refresh rate the window was measured against.
    pub device_rate_hz: u32,
    /// Which path produced this report.
    pub trigger: FlushTrigger,
}

impl FrameReport {
    /// Fraction of ticks that did not produce a frame, in `[0, 1]`.
    pub fn dropped_fraction(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        f64::from(self.skips) / f64::from(self.ticks)
    }
}

/// Receives FPS measurements from the pacer.
///
/// Listeners are invoked on whichever thread produced the measurement: the
/// render thread for periodic flushes, the executor's thread for idle flushes.
/// They must return quickly.
///
/// Any `Fn(f64) + Send + Sync` closure is a listener.
pub trait FpsChangedListener: Send + Sync {
    /// Called with the measured frames per second.
    fn on_fps_changed(&self, fps: f64);

    /// Called with the full measurement. Forwards the FPS value by default.
    fn on_frame_report(&self, report: &FrameReport) {
        self.on_fps_changed(report.fps);
    }
}

impl<F> FpsChangedListener for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_fps_changed(&self, fps: f64) {
        self(fps)
    }
}
