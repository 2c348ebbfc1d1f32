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

//! Consumers for the measurements produced by the frame pacer.
//!
//! Every type here implements [`FpsChangedListener`](tempo_core::FpsChangedListener)
//! and can be handed to a pacer directly.

#![warn(missing_docs)]

pub mod channel;
pub mod history;
pub mod logging;

pub use channel::ChannelFpsListener;
pub use history::{FpsHistory, HistoryListener, RingBuffer, FPS_HISTORY_LEN};
pub use logging::LogFpsListener;
