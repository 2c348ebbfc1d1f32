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

//! The frame pacer: per-tick render decisions and FPS measurement.

use crate::config::{ConfigResult, PacerConfig};
use crate::control::{ControlMessage, PacerControl};
use crate::slot::ListenerSlot;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tempo_core::{
    DeferredExecutor, FlushTrigger, FpsChangedListener, FrameReport, MonotonicClock, RefreshRate,
    ONE_MILLISECOND_NS,
};

/// Default idle time after which a partial measurement window is flushed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(50);

/// Default tolerance before a late tick counts as a missed VSYNC pulse.
pub const DEFAULT_VSYNC_SLACK: Duration = Duration::from_nanos(ONE_MILLISECOND_NS);

/// Counters of the current measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowSnapshot {
    /// Ticks observed since the last flush, including inferred missed ones.
    pub ticks: u32,
    /// Ticks that did not produce a frame since the last flush.
    pub skips: u32,
    /// Ticks for which rendering was allowed since the last flush.
    pub rendered: u32,
}

/// Flush-scoped state. Shared between the render thread and the deferred
/// idle flush; everything else in the pacer belongs to the render thread.
#[derive(Debug, Default)]
struct MeasurementWindow {
    previous_tick_ns: Option<u64>,
    ticks: u32,
    skips: u32,
    rendered: u32,
    previous_drawn_index: u64,
    accumulated_render_ns: u64,
    render_samples: u32,
    /// Bumped by every bookkept tick and every flush. An idle flush armed under
    /// an older epoch has been superseded and must not touch the window.
    epoch: u64,
}

impl MeasurementWindow {
    /// Advances the drawn-frame index for a capped rate.
    ///
    /// The target index is `floor(ticks * user / device)` in integer
    /// arithmetic, so the number of rendered frames never drifts from the
    /// requested ratio by more than one over a window.
    fn advance_pacing(&mut self, user: RefreshRate, device: RefreshRate) -> bool {
        let drawn = u64::from(self.ticks) * u64::from(user.hz()) / u64::from(device.hz());
        log::trace!(
            "Pacing: index={}, previous drawn={}, render={}",
            drawn,
            self.previous_drawn_index,
            drawn > self.previous_drawn_index
        );
        if drawn > self.previous_drawn_index {
            self.previous_drawn_index = drawn;
            true
        } else {
            self.skips = self.skips.saturating_add(1);
            false
        }
    }

    /// Builds a report from the window and resets its counters.
    ///
    /// Returns `None` for an empty window, which has no meaningful rate.
    fn take_report(&mut self, device: RefreshRate, trigger: FlushTrigger) -> Option<FrameReport> {
        self.epoch = self.epoch.wrapping_add(1);
        if self.ticks == 0 {
            return None;
        }

        let dropped = f64::from(self.skips.min(self.ticks)) / f64::from(self.ticks);
        let fps = (1.0 - dropped) * f64::from(device.hz());
        let average_render_ns = if self.render_samples == 0 {
            0
        } else {
            self.accumulated_render_ns / u64::from(self.render_samples)
        };
        let report = FrameReport {
            fps,
            ticks: self.ticks,
            skips: self.skips,
            rendered: self.rendered,
            average_render_time: Duration::from_nanos(average_render_ns),
            device_rate_hz: device.hz(),
            trigger,
        };
        self.reset_counters();
        Some(report)
    }

    /// Closes the window without reporting it.
    fn discard(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.ticks = 0;
        self.skips = 0;
        self.rendered = 0;
        self.previous_drawn_index = 0;
        self.accumulated_render_ns = 0;
        self.render_samples = 0;
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            ticks: self.ticks,
            skips: self.skips,
            rendered: self.rendered,
        }
    }
}

/// State reachable from the control handle and the deferred flush.
pub(crate) struct PacerShared {
    window: Mutex<MeasurementWindow>,
    pub(crate) listener: ListenerSlot,
    destroyed: AtomicBool,
    executor: Option<Arc<dyn DeferredExecutor>>,
}

impl PacerShared {
    fn lock_window(&self) -> MutexGuard<'_, MeasurementWindow> {
        // Listeners never run under this lock, so poisoning cannot leave the
        // counters half-updated.
        self.window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn set_listener(&self, listener: Option<Arc<dyn FpsChangedListener>>) {
        if self.is_destroyed() {
            log::debug!("FramePacer: listener change ignored after destroy.");
            return;
        }
        self.listener.store(listener);
    }

    pub(crate) fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.listener.clear();
        if let Some(executor) = &self.executor {
            executor.cancel();
        }
        log::info!("FramePacer destroyed.");
    }

    /// Deferred flush armed by `post_render` when rendering may have gone idle.
    fn idle_flush(&self, device: RefreshRate, armed_epoch: u64) {
        if self.is_destroyed() {
            return;
        }
        let report = {
            let mut window = self.lock_window();
            if window.epoch != armed_epoch {
                log::trace!("Idle flush superseded by a newer tick.");
                return;
            }
            // The next tick after an idle period must not see the idle gap as
            // missed VSYNC pulses.
            window.previous_tick_ns = None;
            window.take_report(device, FlushTrigger::Idle)
        };
        if let (Some(report), Some(listener)) = (report, self.listener.load()) {
            notify(listener.as_ref(), &report);
        }
    }
}

fn notify(listener: &dyn FpsChangedListener, report: &FrameReport) {
    log::debug!(
        "VSYNC based FPS is {:.2} ({:?}), average render time is {:.3} ms, missed {} out of {} VSYNC pulses",
        report.fps,
        report.trigger,
        report.average_render_time.as_secs_f64() * 1000.0,
        report.skips,
        report.ticks
    );
    listener.on_frame_report(report);
}

/// Decides per refresh tick whether to render, and measures the frame rate.
///
/// `pre_render` and `post_render` must be called from a single thread, in
/// pairs. Rate changes requested through a [`PacerControl`] are applied by that
/// thread at the start of the next tick, so the rates are only ever written
/// from the render thread.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tempo_core::SystemClock;
/// use tempo_pacer::FramePacer;
///
/// let mut pacer = FramePacer::new(Arc::new(SystemClock::new()), None);
/// pacer.set_screen_refresh_rate(60);
/// pacer.update_max_fps(30);
///
/// let rendered = (1..=60u64)
///     .filter(|tick| {
///         let render = pacer.pre_render(tick * 16_666_667);
///         if render {
///             pacer.post_render();
///         }
///         render
///     })
///     .count();
/// assert_eq!(rendered, 30);
/// ```
pub struct FramePacer {
    shared: Arc<PacerShared>,
    clock: Arc<dyn MonotonicClock>,
    control_tx: Sender<ControlMessage>,
    control_rx: Receiver<ControlMessage>,
    device_rate: Option<RefreshRate>,
    user_rate: Option<RefreshRate>,
    cap_requested: bool,
    pending_render_start_ns: Option<u64>,
    idle_flush_armed: bool,
    /// Set while the window holds a tick timestamp recorded by this thread.
    tracking_ticks: bool,
    idle_timeout: Duration,
    vsync_slack_ns: u64,
}

impl FramePacer {
    /// Creates a pacer with default timings.
    ///
    /// Without an executor the pacer never flushes a partial window after an
    /// idle period; reports then only arrive once a full second of ticks has
    /// been observed.
    pub fn new(
        clock: Arc<dyn MonotonicClock>,
        executor: Option<Arc<dyn DeferredExecutor>>,
    ) -> Self {
        if executor.is_none() {
            log::warn!(
                "FramePacer created without a deferred executor. Some FPS reports may be inaccurate."
            );
        }
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(PacerShared {
                window: Mutex::new(MeasurementWindow::default()),
                listener: ListenerSlot::default(),
                destroyed: AtomicBool::new(false),
                executor,
            }),
            clock,
            control_tx,
            control_rx,
            device_rate: None,
            user_rate: None,
            cap_requested: false,
            pending_render_start_ns: None,
            idle_flush_armed: false,
            tracking_ticks: false,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            vsync_slack_ns: ONE_MILLISECOND_NS,
        }
    }

    /// Creates a pacer from a validated configuration.
    pub fn with_config(
        config: &PacerConfig,
        clock: Arc<dyn MonotonicClock>,
        executor: Option<Arc<dyn DeferredExecutor>>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let mut pacer = Self::new(clock, executor);
        pacer.idle_timeout = config.idle_timeout();
        pacer.vsync_slack_ns = config.vsync_slack().as_nanos() as u64;
        if let Some(hz) = config.max_fps {
            pacer.update_max_fps(hz);
        }
        if let Some(hz) = config.screen_refresh_rate {
            pacer.set_screen_refresh_rate(hz);
        }
        Ok(pacer)
    }

    /// Returns a thread-safe handle for adjusting this pacer from other threads.
    pub fn control(&self) -> PacerControl {
        PacerControl::new(self.control_tx.clone(), Arc::clone(&self.shared))
    }

    /// Records the display's native refresh rate.
    ///
    /// Until a cap is requested with [`update_max_fps`](Self::update_max_fps)
    /// the cap follows the display rate, so only measurement happens. Once a
    /// cap was requested, pacing is recomputed against the new rate. Zero is
    /// ignored.
    pub fn set_screen_refresh_rate(&mut self, hz: u32) {
        let Some(rate) = RefreshRate::new(hz) else {
            log::warn!("FramePacer: ignoring screen refresh rate of 0 Hz.");
            return;
        };
        let previous = self.device_rate.replace(rate);
        match self.user_rate {
            Some(user) if self.cap_requested => {
                self.rebase_pacing();
                log::info!("FramePacer: user defined ratio is {:.3}", user.ratio_to(rate));
            }
            _ => self.user_rate = Some(rate),
        }
        if previous != Some(rate) {
            log::debug!(
                "FramePacer: device screen frequency is {}, current max FPS is {}",
                rate,
                self.user_rate.map_or(hz, RefreshRate::hz)
            );
        }
    }

    /// Sets the requested frame-rate cap.
    ///
    /// A cap equal to or above the display rate renders every tick. Repeating
    /// the current cap does nothing. Zero is ignored.
    pub fn update_max_fps(&mut self, hz: u32) {
        let Some(rate) = RefreshRate::new(hz) else {
            log::warn!("FramePacer: ignoring max FPS of 0.");
            return;
        };
        if self.user_rate == Some(rate) {
            return;
        }
        self.user_rate = Some(rate);
        self.cap_requested = true;
        self.rebase_pacing();
        log::debug!("FramePacer: user set max FPS to {}", rate.hz());
    }

    /// Replaces the FPS listener. `None` stops notifications.
    pub fn set_fps_changed_listener(&self, listener: Option<Arc<dyn FpsChangedListener>>) {
        self.shared.set_listener(listener);
    }

    /// Stops all notifications and cancels any pending idle flush.
    ///
    /// Every later tick renders. Calling it again has no effect.
    pub fn destroy(&self) {
        self.shared.destroy();
    }

    /// Returns `true` once [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.shared.is_destroyed()
    }

    /// The display's refresh rate, once reported.
    pub fn screen_refresh_rate(&self) -> Option<RefreshRate> {
        self.device_rate
    }

    /// The current frame-rate cap, once known.
    pub fn max_fps(&self) -> Option<RefreshRate> {
        self.user_rate
    }

    /// Returns `true` when ticks may be skipped to honor the cap.
    pub fn is_pacing(&self) -> bool {
        self.pacing_rate().is_some()
    }

    /// Counters of the measurement window currently being filled.
    pub fn window(&self) -> WindowSnapshot {
        self.shared.lock_window().snapshot()
    }

    /// Decides whether the frame for the tick at `timestamp_ns` should render.
    ///
    /// `timestamp_ns` is the refresh signal's time in the pacer clock's
    /// timebase. Must be followed by [`post_render`](Self::post_render) when it
    /// returns `true` and the frame was rendered.
    pub fn pre_render(&mut self, timestamp_ns: u64) -> bool {
        self.apply_control_messages();
        if std::mem::take(&mut self.idle_flush_armed) {
            if let Some(executor) = &self.shared.executor {
                executor.cancel();
            }
        }

        let Some(device) = self.device_rate else {
            return true;
        };
        if self.shared.is_destroyed() {
            return true;
        }
        let pacing = self.pacing_rate();
        let listening = self.shared.listener.is_present();
        if pacing.is_none() && !listening {
            if std::mem::take(&mut self.tracking_ticks) {
                // Untracked ticks follow; the next bookkept one starts afresh.
                self.shared.lock_window().previous_tick_ns = None;
                log::trace!("FramePacer: tick tracking suspended.");
            }
            return true;
        }

        let render = {
            let mut window = self.shared.lock_window();
            window.epoch = window.epoch.wrapping_add(1);
            self.tracking_ticks = true;

            let mut skipped_now = 0u32;
            let late_threshold = device.period_ns() + self.vsync_slack_ns;
            if let Some(previous) = window.previous_tick_ns {
                let elapsed = timestamp_ns.saturating_sub(previous);
                if elapsed > late_threshold {
                    skipped_now = u32::try_from(elapsed / late_threshold).unwrap_or(u32::MAX);
                    window.skips = window.skips.saturating_add(skipped_now);
                    log::debug!(
                        "Skipped {} VSYNC pulses since last actual render, total skipped in measurement period {} / {}",
                        skipped_now,
                        window.skips,
                        window.ticks
                    );
                }
            }
            window.previous_tick_ns = Some(timestamp_ns);
            window.ticks = window.ticks.saturating_add(skipped_now).saturating_add(1);

            let render = match pacing {
                Some(user) => window.advance_pacing(user, device),
                None => true,
            };
            if render {
                window.rendered = window.rendered.saturating_add(1);
            }
            // Without a listener the window only serves pacing; keep it bounded.
            if !listening && window.ticks >= device.hz() {
                window.discard();
            }
            render
        };

        if render {
            self.pending_render_start_ns = Some(self.clock.now_ns());
        }
        render
    }

    /// Records the end of a rendered frame and flushes the measurement window
    /// when it is complete.
    pub fn post_render(&mut self) {
        let render_start = self.pending_render_start_ns.take();
        let Some(listener) = self.shared.listener.load() else {
            return;
        };
        let Some(device) = self.device_rate else {
            return;
        };
        if self.shared.is_destroyed() {
            return;
        }

        let (report, epoch) = {
            let mut window = self.shared.lock_window();
            if let Some(start) = render_start {
                let elapsed = self.clock.now_ns().saturating_sub(start);
                window.accumulated_render_ns = window.accumulated_render_ns.saturating_add(elapsed);
                window.render_samples = window.render_samples.saturating_add(1);
            }
            let report = if window.ticks >= device.hz() {
                window.take_report(device, FlushTrigger::Periodic)
            } else {
                None
            };
            (report, window.epoch)
        };

        if let Some(report) = report {
            notify(listener.as_ref(), &report);
        }
        // Armed even after a periodic flush: if rendering stops here, the idle
        // flush still has to forget the last tick timestamp.
        self.arm_idle_flush(device, epoch);
    }

    fn arm_idle_flush(&mut self, device: RefreshRate, epoch: u64) {
        let Some(executor) = &self.shared.executor else {
            return;
        };
        self.idle_flush_armed = true;
        let shared: Weak<PacerShared> = Arc::downgrade(&self.shared);
        executor.schedule(
            self.idle_timeout,
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.idle_flush(device, epoch);
                }
            }),
        );
    }

    /// Returns the cap when it is below the display rate.
    fn pacing_rate(&self) -> Option<RefreshRate> {
        match (self.device_rate, self.user_rate) {
            (Some(device), Some(user)) if user < device => Some(user),
            _ => None,
        }
    }

    /// Moves the drawn-frame index onto the current ratio so a cap change in
    /// the middle of a window neither bursts nor stalls.
    fn rebase_pacing(&self) {
        let (Some(device), Some(user)) = (self.device_rate, self.user_rate) else {
            return;
        };
        let mut window = self.shared.lock_window();
        window.previous_drawn_index =
            u64::from(window.ticks) * u64::from(user.hz()) / u64::from(device.hz());
    }

    fn apply_control_messages(&mut self) {
        while let Ok(message) = self.control_rx.try_recv() {
            match message {
                ControlMessage::ScreenRefreshRate(hz) => self.set_screen_refresh_rate(hz),
                ControlMessage::MaxFps(hz) => self.update_max_fps(hz),
            }
        }
    }
}

impl Drop for FramePacer {
    fn drop(&mut self) {
        if !self.idle_flush_armed {
            return;
        }
        if let Some(executor) = &self.shared.executor {
            executor.cancel();
        }
    }
}

impl std::fmt::Debug for FramePacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePacer")
            .field("device_rate", &self.device_rate)
            .field("user_rate", &self.user_rate)
            .field("window", &self.window())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
