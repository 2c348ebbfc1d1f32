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

//! A deferred executor for hosts already running a tokio runtime.

use std::sync::Mutex;
use std::time::Duration;
use tempo_core::{DeferredExecutor, DeferredTask};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs each deferred task as a sleeping tokio task on the given runtime.
///
/// Cancelling aborts the sleeping task. As with every executor, a task that has
/// already woken up may still complete.
#[derive(Debug)]
pub struct TokioExecutor {
    runtime: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TokioExecutor {
    /// Creates an executor spawning onto `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Mutex::new(None),
        }
    }

    /// Creates an executor for the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    fn replace(&self, next: Option<JoinHandle<()>>) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = std::mem::replace(&mut *pending, next) {
            previous.abort();
        }
    }
}

impl DeferredExecutor for TokioExecutor {
    fn schedule(&self, delay: Duration, task: DeferredTask) {
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        self.replace(Some(join));
    }

    fn cancel(&self) {
        self.replace(None);
    }
}

impl Drop for TokioExecutor {
    fn drop(&mut self) {
        self.replace(None);
    }
}
