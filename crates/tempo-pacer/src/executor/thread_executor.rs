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

//! A deferred executor backed by a dedicated timer thread.

use crossbeam_channel::{RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};
use tempo_core::{DeferredExecutor, DeferredTask};

enum TimerCommand {
    Schedule { deadline: Instant, task: DeferredTask },
    Cancel,
}

/// Runs deferred tasks on its own thread.
///
/// Commands are sent over a channel, so `schedule` and `cancel` never block the
/// caller. Cancellation is asynchronous: a task whose deadline passed just
/// before `cancel` was called may still run, so callers that need strict
/// supersession must check for it inside the task.
pub struct ThreadExecutor {
    sender: Option<Sender<TimerCommand>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ThreadExecutor {
    /// Spawns the timer thread with the given name.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded::<TimerCommand>();
        let name = name.into();
        let thread_name = name.clone();

        let handle = thread::Builder::new().name(thread_name).spawn(move || {
            log::debug!("Timer thread '{}' started.", name);
            let mut pending: Option<(Instant, DeferredTask)> = None;

            loop {
                let command = match &pending {
                    Some((deadline, _)) => match receiver.recv_deadline(*deadline) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    },
                    None => match receiver.recv() {
                        Ok(command) => Some(command),
                        Err(_) => break,
                    },
                };

                match command {
                    Some(TimerCommand::Schedule { deadline, task }) => {
                        pending = Some((deadline, task));
                    }
                    Some(TimerCommand::Cancel) => pending = None,
                    None => {
                        if let Some((_, task)) = pending.take() {
                            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                                log::error!("Deferred task panicked on timer thread '{}'.", name);
                            }
                        }
                    }
                }
            }
            log::debug!("Timer thread '{}' stopped.", name);
        })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    fn send(&self, command: TimerCommand) {
        if let Some(sender) = &self.sender {
            if sender.send(command).is_err() {
                log::warn!("Timer thread is gone; deferred command dropped.");
            }
        }
    }
}

impl DeferredExecutor for ThreadExecutor {
    fn schedule(&self, delay: Duration, task: DeferredTask) {
        self.send(TimerCommand::Schedule {
            deadline: Instant::now() + delay,
            task,
        });
    }

    fn cancel(&self) {
        self.send(TimerCommand::Cancel);
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        // Disconnecting the channel stops the thread; a pending task is dropped.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            // The last reference may be released by a task on the timer thread itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn task_fires_after_delay() {
        let executor = ThreadExecutor::spawn("test-timer").unwrap();
        let (tx, rx) = bounded(1);
        let armed_at = Instant::now();

        executor.schedule(
            Duration::from_millis(20),
            Box::new(move || {
                let _ = tx.send(Instant::now());
            }),
        );

        let fired_at = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("task should fire");
        assert!(fired_at.duration_since(armed_at) >= Duration::from_millis(20));
    }

    #[test]
    fn cancelled_task_never_fires() {
        let executor = ThreadExecutor::spawn("test-timer").unwrap();
        let (tx, rx) = bounded::<()>(1);

        executor.schedule(
            Duration::from_millis(50),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        executor.cancel();
        executor.cancel();

        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn rescheduling_replaces_pending_task() {
        let executor = ThreadExecutor::spawn("test-timer").unwrap();
        let (tx, rx) = bounded(2);
        let first = tx.clone();

        executor.schedule(
            Duration::from_millis(30),
            Box::new(move || {
                let _ = first.send("first");
            }),
        );
        executor.schedule(
            Duration::from_millis(30),
            Box::new(move || {
                let _ = tx.send("second");
            }),
        );

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok("second"));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn panicking_task_does_not_kill_the_thread() {
        let executor = ThreadExecutor::spawn("test-timer").unwrap();
        executor.schedule(Duration::from_millis(1), Box::new(|| panic!("boom")));
        thread::sleep(Duration::from_millis(30));

        let (tx, rx) = bounded(1);
        executor.schedule(
            Duration::from_millis(1),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn drop_joins_thread_without_running_pending_task() {
        let (tx, rx) = bounded::<()>(1);
        {
            let executor = ThreadExecutor::spawn("test-timer").unwrap();
            executor.schedule(
                Duration::from_secs(10),
                Box::new(move || {
                    let _ = tx.send(());
                }),
            );
        }
        assert!(rx.try_recv().is_err());
    }
}
