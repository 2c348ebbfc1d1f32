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

//! Cross-thread publication of the FPS listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tempo_core::FpsChangedListener;

/// A shared, optional listener handle.
///
/// Writers replace the whole handle (last write wins). Readers take one
/// snapshot per use, so a tick keeps the listener it started with even if the
/// slot changes mid-tick. The presence flag lets the render thread's fast path
/// skip the lock entirely while no listener is registered.
#[derive(Default)]
pub(crate) struct ListenerSlot {
    present: AtomicBool,
    listener: RwLock<Option<Arc<dyn FpsChangedListener>>>,
}

impl ListenerSlot {
    pub(crate) fn store(&self, listener: Option<Arc<dyn FpsChangedListener>>) {
        let mut guard = self
            .listener
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.present.store(listener.is_some(), Ordering::Release);
        *guard = listener;
    }

    pub(crate) fn load(&self) -> Option<Arc<dyn FpsChangedListener>> {
        if !self.is_present() {
            return None;
        }
        self.listener
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    #[inline]
    pub(crate) fn is_present(&self) -> bool {
        self.present.load(Ordering::Acquire)
    }

    pub(crate) fn clear(&self) {
        self.store(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::thread;

    #[test]
    fn empty_slot_loads_nothing() {
        let slot = ListenerSlot::default();
        assert!(!slot.is_present());
        assert!(slot.load().is_none());
    }

    #[test]
    fn last_write_wins() {
        let slot = ListenerSlot::default();
        let first = Arc::new(AtomicU64::new(0));
        let second = Arc::new(AtomicU64::new(0));

        let f = Arc::clone(&first);
        slot.store(Some(Arc::new(move |fps: f64| {
            f.store(fps as u64, Ordering::SeqCst)
        })));
        let s = Arc::clone(&second);
        slot.store(Some(Arc::new(move |fps: f64| {
            s.store(fps as u64, Ordering::SeqCst)
        })));

        slot.load().unwrap().on_fps_changed(42.0);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 42);

        slot.clear();
        assert!(!slot.is_present());
        assert!(slot.load().is_none());
    }

    #[test]
    fn snapshot_survives_replacement() {
        let slot = ListenerSlot::default();
        let calls = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&calls);
        slot.store(Some(Arc::new(move |_: f64| {
            c.fetch_add(1, Ordering::SeqCst);
        })));

        let snapshot = slot.load().unwrap();
        slot.clear();
        snapshot.on_fps_changed(60.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let slot = Arc::new(ListenerSlot::default());
        let writer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for i in 0..1000 {
                    if i % 2 == 0 {
                        slot.store(Some(Arc::new(|_: f64| {})));
                    } else {
                        slot.clear();
                    }
                }
            })
        };

        for _ in 0..1000 {
            if let Some(listener) = slot.load() {
                listener.on_fps_changed(1.0);
            }
        }
        writer.join().unwrap();
        assert!(!slot.is_present(), "last write cleared the slot");
    }
}
