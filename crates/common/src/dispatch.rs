// Heapscope
// Copyright (C) 2025 Heapscope Contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Hand-off primitive onto the embedding application's control thread.
///
/// Background workers never touch the presentation tree directly; a
/// completed result is wrapped in a closure and posted here, mirroring
/// a widget toolkit's "invoke later" facility. Implementations decide
/// when and on which thread posted closures run.
pub trait UiDispatcher: Send + Sync {
    /// Queue `task` to run on the control thread at some later point.
    fn run_later(&self, task: Box<dyn FnOnce() + Send>);
}

/// Dispatcher that runs every task inline on the posting thread.
///
/// Suitable for embeddings whose shared state is internally locked and
/// for headless use; not a substitute for a real event loop when the
/// embedding requires single-threaded widget access.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateDispatcher;

impl UiDispatcher for ImmediateDispatcher {
    fn run_later(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}

/// Dispatcher that parks tasks until the owner drains them.
///
/// Models an event loop the caller pumps by hand: posted closures
/// accumulate and run, in posting order, when [`QueuedDispatcher::drain`]
/// is called from the control thread.
#[derive(Default)]
pub struct QueuedDispatcher {
    queue: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
}

impl QueuedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs all queued tasks on the calling thread, in posting order.
    /// Tasks posted while draining run in the same pass.
    pub fn drain(&self) {
        loop {
            let task = self.queue.lock().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

impl UiDispatcher for QueuedDispatcher {
    fn run_later(&self, task: Box<dyn FnOnce() + Send>) {
        self.queue.lock().push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn immediate_dispatcher_runs_inline() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        ImmediateDispatcher.run_later(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queued_dispatcher_defers_until_drained() {
        let dispatcher = QueuedDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let h = Arc::clone(&hits);
            dispatcher.run_later(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.pending(), 3);

        dispatcher.drain();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.pending(), 0);
    }
}
