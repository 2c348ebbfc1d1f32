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

//! Idle flushing with real timer threads and a real clock.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempo_core::{
    DeferredExecutor, FlushTrigger, FpsChangedListener, FrameReport, MonotonicClock, SystemClock,
};
use tempo_pacer::{FramePacer, PacerConfig, ThreadExecutor, TokioExecutor};

struct ReportSink(Sender<FrameReport>);

impl FpsChangedListener for ReportSink {
    fn on_fps_changed(&self, _fps: f64) {}

    fn on_frame_report(&self, report: &FrameReport) {
        let _ = self.0.send(*report);
    }
}

fn pacer_with(
    executor: Arc<dyn DeferredExecutor>,
) -> (FramePacer, Arc<SystemClock>, Receiver<FrameReport>) {
    let clock = Arc::new(SystemClock::new());
    let config = PacerConfig {
        screen_refresh_rate: Some(60),
        idle_timeout_ms: 150,
        ..Default::default()
    };
    let pacer = FramePacer::with_config(&config, clock.clone(), Some(executor)).unwrap();
    let (tx, rx) = unbounded();
    pacer.set_fps_changed_listener(Some(Arc::new(ReportSink(tx))));
    (pacer, clock, rx)
}

fn drive(pacer: &mut FramePacer, clock: &SystemClock, frames: usize) {
    for _ in 0..frames {
        if pacer.pre_render(clock.now_ns()) {
            thread::sleep(Duration::from_millis(1));
            pacer.post_render();
        }
        thread::sleep(Duration::from_millis(4));
    }
}

#[test]
fn timer_thread_flushes_after_idle() {
    let executor = Arc::new(ThreadExecutor::spawn("pacer-idle").unwrap());
    let (mut pacer, clock, reports) = pacer_with(executor);

    drive(&mut pacer, &clock, 10);

    let report = reports
        .recv_timeout(Duration::from_secs(2))
        .expect("idle flush should report");
    assert_eq!(report.trigger, FlushTrigger::Idle);
    // A stalled sleep may add inferred missed pulses, never fewer ticks.
    assert!(report.ticks >= 10);
    assert_eq!(report.rendered, 10);
    assert!(report.average_render_time >= Duration::from_millis(1));
    assert!(reports.recv_timeout(Duration::from_millis(400)).is_err());

    // The next burst starts a fresh window.
    drive(&mut pacer, &clock, 3);
    let report = reports
        .recv_timeout(Duration::from_secs(2))
        .expect("second idle flush should report");
    assert_eq!(report.rendered, 3);
    assert_eq!(report.ticks, 3 + report.skips);
}

#[test]
fn destroy_stops_timer_thread_reports() {
    let executor = Arc::new(ThreadExecutor::spawn("pacer-idle").unwrap());
    let (mut pacer, clock, reports) = pacer_with(executor);

    drive(&mut pacer, &clock, 5);
    pacer.destroy();

    assert!(reports.recv_timeout(Duration::from_millis(400)).is_err());
}

#[test]
fn tokio_runtime_flushes_after_idle() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .unwrap();
    let executor = Arc::new(TokioExecutor::new(runtime.handle().clone()));
    let (mut pacer, clock, reports) = pacer_with(executor);

    drive(&mut pacer, &clock, 6);

    let report = reports
        .recv_timeout(Duration::from_secs(2))
        .expect("idle flush should report");
    assert_eq!(report.trigger, FlushTrigger::Idle);
    assert_eq!(report.rendered, 6);
}
