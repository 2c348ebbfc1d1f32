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

//! Cancellable single-shot deferred execution.
//!
//! The pacer uses a deferred task to flush FPS measurements when rendering goes
//! idle. Where that task runs is up to the host: on a dedicated timer thread, on
//! an async runtime, or on the host's own loop through [`PolledExecutor`].

use crate::clock::MonotonicClock;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A unit of deferred work.
pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// A facility that runs at most one pending task after a delay.
///
/// Implementations hold a single slot: scheduling while a task is pending
/// replaces it. Cancelling when nothing is pending, or after the task already
/// fired, is a no-op.
pub trait DeferredExecutor: Send + Sync + 'static {
    /// Arms `task` to run once after `delay`, replacing any pending task.
    fn schedule(&self, delay: Duration, task: DeferredTask);

    /// Drops the pending task, if any.
    fn cancel(&self);
}

struct PendingTask {
    deadline_ns: u64,
    task: DeferredTask,
}

/// A [`DeferredExecutor`] drained explicitly by the host's loop.
///
/// Tasks never run on their own: the owner calls [`PolledExecutor::run_due`]
/// from its event loop, so the task executes on the same thread as the loop.
/// Deadlines are measured with the supplied clock.
pub struct PolledExecutor {
    clock: Arc<dyn MonotonicClock>,
    pending: Mutex<Option<PendingTask>>,
}

impl PolledExecutor {
    /// Creates an executor measuring deadlines with `clock`.
    pub fn new(clock: Arc<dyn MonotonicClock>) -> Self {
        Self {
            clock,
            pending: Mutex::new(None),
        }
    }

    /// Returns `true` if a task is waiting to run.
    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    /// Returns the deadline of the pending task, in the clock's timebase.
    pub fn deadline_ns(&self) -> Option<u64> {
        self.lock().as_ref().map(|p| p.deadline_ns)
    }

    /// Runs the pending task if its deadline has passed.
    ///
    /// The task is taken out of the slot before it runs, so it may schedule a
    /// new task itself. Returns `true` if a task ran.
    pub fn run_due(&self) -> bool {
        let now = self.clock.now_ns();
        let due = {
            let mut pending = self.lock();
            match pending.as_ref() {
                Some(p) if p.deadline_ns <= now => pending.take(),
                _ => None,
            }
        };
        match due {
            Some(p) => {
                log::trace!("PolledExecutor: running task due at {}ns", p.deadline_ns);
                (p.task)();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PendingTask>> {
        // A panicking task never runs under this lock, so a poisoned slot still
        // holds consistent data.
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeferredExecutor for PolledExecutor {
    fn schedule(&self, delay: Duration, task: DeferredTask) {
        let deadline_ns = self
            .clock
            .now_ns()
            .saturating_add(delay.as_nanos() as u64);
        *self.lock() = Some(PendingTask { deadline_ns, task });
    }

    fn cancel(&self) {
        self.lock().take();
    }
}

impl fmt::Debug for PolledExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolledExecutor")
            .field("clock", &self.clock)
            .field("deadline_ns", &self.deadline_ns())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(counter: &Arc<AtomicUsize>) -> DeferredTask {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn task_runs_only_after_deadline() {
        let clock = Arc::new(ManualClock::new(0));
        let executor = PolledExecutor::new(clock.clone());
        let counter = Arc::new(AtomicUsize::new(0));

        executor.schedule(Duration::from_millis(50), counting_task(&counter));
        assert_eq!(executor.deadline_ns(), Some(50_000_000));

        clock.advance(Duration::from_millis(49));
        assert!(!executor.run_due());
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        clock.advance(Duration::from_millis(1));
        assert!(executor.run_due());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!executor.is_armed());

        // Single-shot: nothing left to run.
        clock.advance(Duration::from_millis(100));
        assert!(!executor.run_due());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scheduling_replaces_pending_task() {
        let clock = Arc::new(ManualClock::new(0));
        let executor = PolledExecutor::new(clock.clone());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        executor.schedule(Duration::from_millis(10), counting_task(&first));
        executor.schedule(Duration::from_millis(20), counting_task(&second));

        clock.advance(Duration::from_millis(20));
        assert!(executor.run_due());
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_is_idempotent() {
        let clock = Arc::new(ManualClock::new(0));
        let executor = PolledExecutor::new(clock.clone());
        let counter = Arc::new(AtomicUsize::new(0));

        executor.cancel();
        executor.schedule(Duration::from_millis(10), counting_task(&counter));
        executor.cancel();
        executor.cancel();

        clock.advance(Duration::from_millis(10));
        assert!(!executor.run_due());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn task_may_reschedule_itself() {
        let clock = Arc::new(ManualClock::new(0));
        let executor = Arc::new(PolledExecutor::new(clock.clone()));
        let inner = Arc::clone(&executor);

        executor.schedule(
            Duration::from_millis(5),
            Box::new(move || inner.schedule(Duration::from_millis(5), Box::new(|| {}))),
        );

        clock.advance(Duration::from_millis(5));
        assert!(executor.run_due());
        assert_eq!(executor.deadline_ns(), Some(10_000_000));
    }
}
