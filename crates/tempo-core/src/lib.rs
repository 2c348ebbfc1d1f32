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

//! # Tempo Core
//!
//! Foundational crate containing the traits, core types, and interface contracts
//! shared by the frame pacer and its telemetry consumers.
//!
//! This crate defines the abstract "what" of pacing: a monotonic clock, a
//! cancellable deferred executor, refresh-rate arithmetic, and the listener
//! contract for FPS reports. `tempo-pacer` provides the control loop built on
//! top of these contracts, and `tempo-telemetry` provides listeners for it.

#![warn(missing_docs)]

pub mod clock;
pub mod executor;
pub mod listener;
pub mod rate;

pub use clock::{ManualClock, MonotonicClock, SystemClock};
pub use executor::{DeferredExecutor, DeferredTask, PolledExecutor};
pub use listener::{FlushTrigger, FpsChangedListener, FrameReport};
pub use rate::{RefreshRate, ONE_MILLISECOND_NS, ONE_SECOND_NS};
