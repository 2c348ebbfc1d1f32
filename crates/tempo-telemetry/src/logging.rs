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

//! Writes every report through the `log` facade.

use tempo_core::{FlushTrigger, FpsChangedListener, FrameReport};

/// Logs each FPS report at a configurable level.
#[derive(Debug, Clone)]
pub struct LogFpsListener {
    level: log::Level,
    target: &'static str,
}

impl LogFpsListener {
    /// Creates a listener logging at `level` under the `tempo::fps` target.
    pub fn new(level: log::Level) -> Self {
        Self {
            level,
            target: "tempo::fps",
        }
    }

    /// Overrides the log target.
    pub fn with_target(mut self, target: &'static str) -> Self {
        self.target = target;
        self
    }

    /// The level reports are logged at.
    pub fn level(&self) -> log::Level {
        self.level
    }
}

impl Default for LogFpsListener {
    fn default() -> Self {
        Self::new(log::Level::Info)
    }
}

impl FpsChangedListener for LogFpsListener {
    fn on_fps_changed(&self, fps: f64) {
        log::log!(target: self.target, self.level, "FPS: {:.2}", fps);
    }

    fn on_frame_report(&self, report: &FrameReport) {
        let source = match report.trigger {
            FlushTrigger::Periodic => "periodic",
            FlushTrigger::Idle => "idle",
        };
        log::log!(
            target: self.target,
            self.level,
            "FPS: {:.2} ({} report, {} ticks, {} skipped, avg render {:.3} ms @ {} Hz)",
            report.fps,
            source,
            report.ticks,
            report.skips,
            report.average_render_time.as_secs_f64() * 1000.0,
            report.device_rate_hz
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info() {
        let listener = LogFpsListener::default();
        assert_eq!(listener.level(), log::Level::Info);
        assert_eq!(listener.target, "tempo::fps");
    }

    #[test]
    fn target_can_be_overridden() {
        let listener = LogFpsListener::new(log::Level::Debug).with_target("sandbox");
        assert_eq!(listener.target, "sandbox");
        // No logger installed: must not panic.
        listener.on_fps_changed(59.9);
    }
}
