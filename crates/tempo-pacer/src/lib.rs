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

//! # Tempo Pacer
//!
//! The frame pacer decides, once per display refresh tick, whether a render
//! pass should run, and measures the resulting frame rate.
//!
//! The render thread owns a [`FramePacer`] and calls
//! [`pre_render`](FramePacer::pre_render) and
//! [`post_render`](FramePacer::post_render) around each frame. Other threads
//! adjust it through a [`PacerControl`] handle.

#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod executor;
pub mod pacer;
mod slot;

pub use config::{ConfigError, ConfigResult, PacerConfig};
pub use control::PacerControl;
pub use executor::{ThreadExecutor, TokioExecutor};
pub use pacer::{FramePacer, WindowSnapshot, DEFAULT_IDLE_TIMEOUT, DEFAULT_VSYNC_SLACK};
