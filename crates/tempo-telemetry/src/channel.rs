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

//! Forwards reports to another thread over a bounded channel.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use tempo_core::{FpsChangedListener, FrameReport};

/// Sends each report over a bounded `crossbeam-channel`.
///
/// Sending never blocks: when the consumer falls behind, the report is dropped
/// and counted instead. Reports produced after the receiver is gone are
/// dropped silently.
#[derive(Debug)]
pub struct ChannelFpsListener {
    sender: Sender<FrameReport>,
    dropped: AtomicU64,
}

impl ChannelFpsListener {
    /// Creates a listener with a channel holding at most `capacity` reports.
    pub fn new(capacity: usize) -> (Self, Receiver<FrameReport>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        (Self::from_sender(sender), receiver)
    }

    /// Wraps an existing sender.
    pub fn from_sender(sender: Sender<FrameReport>) -> Self {
        Self {
            sender,
            dropped: AtomicU64::new(0),
        }
    }

    /// Reports dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FpsChangedListener for ChannelFpsListener {
    fn on_fps_changed(&self, _fps: f64) {}

    fn on_frame_report(&self, report: &FrameReport) {
        match self.sender.try_send(*report) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::trace!("FPS report channel full, {} report(s) dropped", dropped);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
