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

//! Concrete [`DeferredExecutor`](tempo_core::DeferredExecutor) implementations.
//!
//! `tempo-core` also ships a polled executor for hosts that run their own loop.

mod thread_executor;
mod tokio_executor;

pub use self::thread_executor::ThreadExecutor;
pub use self::tokio_executor::TokioExecutor;
