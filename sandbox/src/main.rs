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

//! Drives a frame pacer from a simulated display.
//!
//! Usage: `sandbox [config.json]`. The display starts at the configured
//! refresh rate (60 Hz by default). A control thread caps the frame rate to
//! 30 FPS after two seconds and switches the display to 120 Hz after four.
//! Rendering then pauses to show the idle report before the pacer is destroyed.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempo_core::{DeferredExecutor, FpsChangedListener, FrameReport, MonotonicClock, SystemClock};
use tempo_pacer::{FramePacer, PacerConfig, PacerControl, ThreadExecutor};
use tempo_telemetry::{HistoryListener, LogFpsListener};

const RUN_TIME: Duration = Duration::from_secs(6);
const IDLE_PAUSE: Duration = Duration::from_millis(250);

/// Logs every report and keeps a rolling history of them.
struct SandboxListener {
    log: LogFpsListener,
    history: HistoryListener,
}

impl FpsChangedListener for SandboxListener {
    fn on_fps_changed(&self, fps: f64) {
        self.log.on_fps_changed(fps);
        self.history.on_fps_changed(fps);
    }

    fn on_frame_report(&self, report: &FrameReport) {
        self.log.on_frame_report(report);
        self.history.on_frame_report(report);
    }
}

fn load_config() -> Result<PacerConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => PacerConfig::from_file(&path)
            .with_context(|| format!("Failed to load pacer config from '{}'", path))?,
        None => PacerConfig::default(),
    };
    config.screen_refresh_rate.get_or_insert(60);
    Ok(config)
}

fn spawn_controller(control: PacerControl) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("sandbox-control".into())
        .spawn(move || {
            thread::sleep(Duration::from_secs(2));
            log::info!("Capping frame rate to 30 FPS");
            control.update_max_fps(30);

            thread::sleep(Duration::from_secs(2));
            log::info!("Switching display to 120 Hz");
            control.set_screen_refresh_rate(120);
        })
        .context("Failed to spawn control thread")
}

/// Simulated render work, with an occasional long frame.
fn render(frame: u64) {
    let work = if frame % 97 == 0 {
        Duration::from_millis(24)
    } else {
        Duration::from_millis(2 + frame % 3)
    };
    thread::sleep(work);
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let clock = Arc::new(SystemClock::new());
    let executor: Arc<dyn DeferredExecutor> = Arc::new(
        ThreadExecutor::spawn("pacer-idle-flush").context("Failed to spawn idle flush thread")?,
    );
    let mut pacer = FramePacer::with_config(&config, clock.clone(), Some(executor))
        .context("Invalid pacer configuration")?;

    let history = HistoryListener::default();
    pacer.set_fps_changed_listener(Some(Arc::new(SandboxListener {
        log: LogFpsListener::default(),
        history: history.clone(),
    })));

    let controller = spawn_controller(pacer.control())?;

    let start = Instant::now();
    let mut next_vsync = start;
    let mut frame = 0u64;
    let mut rendered = 0u64;
    while start.elapsed() < RUN_TIME {
        let period = pacer
            .screen_refresh_rate()
            .map(|rate| rate.period())
            .unwrap_or(Duration::from_millis(16));
        next_vsync += period;
        let now = Instant::now();
        if next_vsync > now {
            thread::sleep(next_vsync - now);
        } else {
            // Missed pulses: realign on the next one.
            next_vsync = now;
        }

        if pacer.pre_render(clock.now_ns()) {
            render(frame);
            pacer.post_render();
            rendered += 1;
        }
        frame += 1;
    }

    log::info!("Rendering paused after {} ticks ({} rendered)", frame, rendered);
    thread::sleep(IDLE_PAUSE);

    pacer.destroy();
    if controller.join().is_err() {
        log::error!("Control thread panicked");
    }

    let history = history.snapshot();
    log::info!(
        "{} reports: average {:.2} FPS, min {:.2}, max {:.2}, variance {:.2}{}",
        history.total_reports(),
        history.average(),
        history.min().unwrap_or_default(),
        history.max().unwrap_or_default(),
        history.variance(),
        if history.is_stuttering() { " (stuttering)" } else { "" }
    );
    Ok(())
}
