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

//! Rolling FPS statistics.

use std::sync::{Arc, Mutex, MutexGuard};
use tempo_core::{FpsChangedListener, FrameReport};

/// Number of reports kept by [`FpsHistory`]; about one minute of periodic reports.
pub const FPS_HISTORY_LEN: usize = 60;

/// Default variance (in FPS²) above which the history is considered stuttering.
pub const DEFAULT_STUTTER_VARIANCE: f32 = 16.0;

/// A fixed-size circular buffer for numerical samples.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    /// Slot the next value is written to.
    next: usize,
    count: usize,
}

impl<T: Default + Copy, const N: usize> RingBuffer<T, N> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            data: [T::default(); N],
            next: 0,
            count: 0,
        }
    }

    /// Pushes a value, overwriting the oldest one when full.
    pub fn push(&mut self, value: T) {
        self.data[self.next] = value;
        self.next = (self.next + 1) % N;
        self.count = (self.count + 1).min(N);
    }

    /// Number of values currently stored.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Most recently pushed value.
    pub fn latest(&self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        Some(self.data[(self.next + N - 1) % N])
    }

    /// Values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let start = (self.next + N - self.count) % N;
        (0..self.count).map(move |i| &self.data[(start + i) % N])
    }
}

impl<T: Default + Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<f32, N> {
    /// Arithmetic mean, or 0 when empty.
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().sum::<f32>() / self.count as f32
    }

    /// Difference between the mean of the newest half and the oldest half.
    ///
    /// Positive when values are rising.
    pub fn trend(&self) -> f32 {
        if self.count < 2 {
            return 0.0;
        }
        let half = self.count / 2;
        let older: f32 = self.iter().take(half).sum();
        let newer: f32 = self.iter().skip(self.count - half).sum();
        (newer - older) / half as f32
    }

    /// Population variance, or 0 with fewer than two values.
    pub fn variance(&self) -> f32 {
        if self.count < 2 {
            return 0.0;
        }
        let mean = self.average();
        self.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / self.count as f32
    }

    /// Smallest value, if any.
    pub fn min(&self) -> Option<f32> {
        self.iter().copied().reduce(f32::min)
    }

    /// Largest value, if any.
    pub fn max(&self) -> Option<f32> {
        self.iter().copied().reduce(f32::max)
    }
}

/// The last [`FPS_HISTORY_LEN`] FPS reports with summary statistics.
///
/// A steady frame rate yields a low variance across reports; a variance above
/// the stutter threshold means the frame rate is swinging between windows.
#[derive(Debug, Clone)]
pub struct FpsHistory {
    samples: RingBuffer<f32, FPS_HISTORY_LEN>,
    stutter_variance: f32,
    total_reports: u64,
    last_report: Option<FrameReport>,
}

impl FpsHistory {
    /// Creates an empty history using `stutter_variance` as the stutter threshold.
    pub fn new(stutter_variance: f32) -> Self {
        Self {
            samples: RingBuffer::new(),
            stutter_variance,
            total_reports: 0,
            last_report: None,
        }
    }

    /// Records a report.
    pub fn record(&mut self, report: &FrameReport) {
        self.samples.push(report.fps as f32);
        self.total_reports += 1;
        self.last_report = Some(*report);
    }

    /// Records a bare FPS value.
    pub fn record_fps(&mut self, fps: f64) {
        self.samples.push(fps as f32);
        self.total_reports += 1;
    }

    /// The retained samples.
    pub fn samples(&self) -> &RingBuffer<f32, FPS_HISTORY_LEN> {
        &self.samples
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.count()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.samples.count() == 0
    }

    /// Reports recorded since creation, including evicted ones.
    pub fn total_reports(&self) -> u64 {
        self.total_reports
    }

    /// The most recent full report, if reports (not bare values) were recorded.
    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    /// Mean FPS over the retained samples.
    pub fn average(&self) -> f32 {
        self.samples.average()
    }

    /// FPS trend; negative while the frame rate is degrading.
    pub fn trend(&self) -> f32 {
        self.samples.trend()
    }

    /// FPS variance over the retained samples.
    pub fn variance(&self) -> f32 {
        self.samples.variance()
    }

    /// Lowest retained FPS.
    pub fn min(&self) -> Option<f32> {
        self.samples.min()
    }

    /// Highest retained FPS.
    pub fn max(&self) -> Option<f32> {
        self.samples.max()
    }

    /// The configured stutter threshold.
    pub fn stutter_variance(&self) -> f32 {
        self.stutter_variance
    }

    /// Whether the variance exceeds the stutter threshold.
    pub fn is_stuttering(&self) -> bool {
        self.variance() > self.stutter_variance
    }
}

impl Default for FpsHistory {
    fn default() -> Self {
        Self::new(DEFAULT_STUTTER_VARIANCE)
    }
}

/// Feeds every report into a shared [`FpsHistory`].
#[derive(Debug, Clone, Default)]
pub struct HistoryListener {
    history: Arc<Mutex<FpsHistory>>,
}

impl HistoryListener {
    /// Wraps a history.
    pub fn new(history: FpsHistory) -> Self {
        Self {
            history: Arc::new(Mutex::new(history)),
        }
    }

    /// Shared handle to the underlying history.
    pub fn history(&self) -> Arc<Mutex<FpsHistory>> {
        Arc::clone(&self.history)
    }

    /// A copy of the history as it is now.
    pub fn snapshot(&self) -> FpsHistory {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, FpsHistory> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FpsChangedListener for HistoryListener {
    fn on_fps_changed(&self, fps: f64) {
        self.lock().record_fps(fps);
    }

    fn on_frame_report(&self, report: &FrameReport) {
        let mut history = self.lock();
        history.record(report);
        if history.is_stuttering() {
            log::debug!(
                "FPS variance {:.2} above stutter threshold {:.2}",
                history.variance(),
                history.stutter_variance()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;
    use tempo_core::FlushTrigger;

    fn report(fps: f64) -> FrameReport {
        FrameReport {
            fps,
            ticks: 60,
            skips: 0,
            rendered: 60,
            average_render_time: Duration::from_millis(2),
            device_rate_hz: 60,
            trigger: FlushTrigger::Periodic,
        }
    }

    #[test]
    fn ring_buffer_overwrites_oldest() {
        let mut rb = RingBuffer::<f32, 3>::new();
        rb.push(1.0);
        rb.push(2.0);
        rb.push(3.0);
        rb.push(4.0);

        let values: Vec<f32> = rb.iter().copied().collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(rb.count(), 3);
        assert_eq!(rb.latest(), Some(4.0));
    }

    #[test]
    fn ring_buffer_partial_iteration_is_chronological() {
        let mut rb = RingBuffer::<f32, 4>::new();
        rb.push(7.0);
        rb.push(8.0);
        let values: Vec<f32> = rb.iter().copied().collect();
        assert_eq!(values, vec![7.0, 8.0]);
    }

    #[test]
    fn ring_buffer_statistics() {
        let mut rb = RingBuffer::<f32, 4>::new();
        rb.push(5.0);
        rb.push(15.0);
        rb.push(5.0);
        rb.push(15.0);
        assert_relative_eq!(rb.average(), 10.0);
        assert_relative_eq!(rb.variance(), 25.0);
        assert_eq!(rb.min(), Some(5.0));
        assert_eq!(rb.max(), Some(15.0));
    }

    #[test]
    fn ring_buffer_trend_compares_halves() {
        let mut rb = RingBuffer::<f32, 4>::new();
        rb.push(1.0);
        rb.push(1.1);
        rb.push(2.0);
        rb.push(2.1);
        assert_relative_eq!(rb.trend(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn empty_ring_buffer() {
        let rb = RingBuffer::<f32, 4>::new();
        assert_eq!(rb.average(), 0.0);
        assert_eq!(rb.trend(), 0.0);
        assert_eq!(rb.variance(), 0.0);
        assert_eq!(rb.min(), None);
        assert_eq!(rb.latest(), None);
    }

    #[test]
    fn steady_rate_is_not_stuttering() {
        let mut history = FpsHistory::default();
        for _ in 0..10 {
            history.record(&report(60.0));
        }
        assert!(!history.is_stuttering());
        assert_relative_eq!(history.average(), 60.0);
        assert_eq!(history.total_reports(), 10);
        assert_eq!(history.last_report().map(|r| r.ticks), Some(60));
    }

    #[test]
    fn swinging_rate_is_stuttering() {
        let mut history = FpsHistory::new(4.0);
        for i in 0..10 {
            history.record(&report(if i % 2 == 0 { 60.0 } else { 40.0 }));
        }
        assert_relative_eq!(history.variance(), 100.0);
        assert!(history.is_stuttering());
    }

    #[test]
    fn history_keeps_only_recent_reports() {
        let mut history = FpsHistory::default();
        for i in 0..(FPS_HISTORY_LEN + 5) {
            history.record_fps(i as f64);
        }
        assert_eq!(history.len(), FPS_HISTORY_LEN);
        assert_eq!(history.total_reports(), (FPS_HISTORY_LEN + 5) as u64);
        assert_eq!(history.min(), Some(5.0));
        assert!(history.trend() > 0.0);
        assert!(history.last_report().is_none());
    }

    #[test]
    fn listener_records_into_shared_history() {
        let listener = HistoryListener::default();
        listener.on_frame_report(&report(30.0));
        listener.on_fps_changed(20.0);

        let snapshot = listener.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_relative_eq!(snapshot.average(), 25.0);
        assert_eq!(listener.history().lock().unwrap().len(), 2);
    }
}
