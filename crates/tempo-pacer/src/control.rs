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

//! Thread-safe control surface for a [`FramePacer`](crate::FramePacer).

use crate::pacer::PacerShared;
use crossbeam_channel::Sender;
use std::sync::Arc;
use tempo_core::FpsChangedListener;

/// Rate reports funnelled to the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlMessage {
    ScreenRefreshRate(u32),
    MaxFps(u32),
}

/// A cloneable handle for adjusting a pacer from any thread.
///
/// Rate changes are queued and applied by the render thread at the start of its
/// next tick. Listener changes and [`destroy`](Self::destroy) take effect
/// immediately.
#[derive(Clone)]
pub struct PacerControl {
    sender: Sender<ControlMessage>,
    shared: Arc<PacerShared>,
}

impl PacerControl {
    pub(crate) fn new(sender: Sender<ControlMessage>, shared: Arc<PacerShared>) -> Self {
        Self { sender, shared }
    }

    /// Queues a new display refresh rate, e.g. after a display-mode switch.
    pub fn set_screen_refresh_rate(&self, hz: u32) {
        self.send(ControlMessage::ScreenRefreshRate(hz));
    }

    /// Queues a new frame-rate cap.
    pub fn update_max_fps(&self, hz: u32) {
        self.send(ControlMessage::MaxFps(hz));
    }

    /// Replaces the FPS listener. `None` stops notifications.
    pub fn set_fps_changed_listener(&self, listener: Option<Arc<dyn FpsChangedListener>>) {
        self.shared.set_listener(listener);
    }

    /// Stops all notifications and cancels any pending idle flush.
    pub fn destroy(&self) {
        self.shared.destroy();
    }

    /// Returns `true` once the pacer has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.shared.is_destroyed()
    }

    /// Returns `true` if a listener is currently registered.
    pub fn has_listener(&self) -> bool {
        self.shared.listener.is_present()
    }

    fn send(&self, message: ControlMessage) {
        if self.sender.send(message).is_err() {
            log::debug!("PacerControl: pacer is gone, dropping {:?}", message);
        }
    }
}

impl std::fmt::Debug for PacerControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacerControl")
            .field("destroyed", &self.is_destroyed())
            .field("queued", &self.sender.len())
            .finish()
    }
}
