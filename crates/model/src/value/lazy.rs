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

//! Heap-wide asynchronous value precomputation.
//!
//! Some derived values (retained size is the canonical case) cannot be
//! resolved per node; they require one pass over the entire heap. That
//! pass is expensive, so it runs on a background thread, starts only
//! after the user confirmed it once, and is single-flight per heap: no
//! matter how many nodes or views ask, one heap sees at most one
//! confirmation prompt and one computation.

use crate::error::ModelResult;
use heapscope_common::{ConfirmationGate, Heap, HeapId, Progress, UiDispatcher};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, error};

/// Callback fired once a heap's values become available.
pub type AvailabilityCallback = dyn Fn() + Send + Sync;

/// The heap-wide computation itself, supplied by the embedding
/// application (it owns the heap model this engine treats as opaque).
pub type ComputeFn = dyn Fn(&dyn Heap, &dyn Progress) -> ModelResult<()> + Send + Sync;

/// Per-heap computation lifecycle.
///
/// Absent from the state map means idle: nothing ran, nothing is
/// running, and a failed or declined attempt has been forgotten so a
/// later explicit request may try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LazyState {
    /// The confirmation prompt is on screen.
    Confirming,
    /// A worker is computing.
    Running,
    /// Values are available.
    Available,
}

struct LazyShared {
    question: String,
    remember_key: String,
    compute: Box<ComputeFn>,
    state: Mutex<HashMap<HeapId, LazyState>>,
    /// Signalled whenever a heap leaves an in-flight state.
    settled: Condvar,
    callbacks: Mutex<HashMap<HeapId, Vec<Weak<AvailabilityCallback>>>>,
}

/// Shared lazy-computation state of one [`ValueType`](super::ValueType).
///
/// Clones share everything, so every view rendering the same type
/// observes the same per-heap availability.
#[derive(Clone)]
pub struct LazyValues {
    shared: Arc<LazyShared>,
}

impl LazyValues {
    /// `question` and `remember_key` feed the confirmation gate;
    /// `compute` performs the actual heap-wide pass.
    pub fn new<F>(question: impl Into<String>, remember_key: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&dyn Heap, &dyn Progress) -> ModelResult<()> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(LazyShared {
                question: question.into(),
                remember_key: remember_key.into(),
                compute: Box::new(compute),
                state: Mutex::new(HashMap::new()),
                settled: Condvar::new(),
                callbacks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Whether the heap-wide pass for `heap` has finished.
    pub fn available(&self, heap: HeapId) -> bool {
        self.shared.state.lock().get(&heap) == Some(&LazyState::Available)
    }

    /// Confirmation-gated background computation.
    ///
    /// Exactly one caller per heap reaches the gate; concurrent callers
    /// arriving while the prompt is up or the worker is running observe
    /// `true` without a second prompt. A declined prompt resets the
    /// heap to idle, so a later explicit request prompts again.
    pub fn compute(&self, heap: &Arc<dyn Heap>, gate: &dyn ConfirmationGate, progress: &Arc<dyn Progress>, ui: &Arc<dyn UiDispatcher>) -> bool {
        let heap_id = heap.id();
        {
            let mut state = self.shared.state.lock();
            if state.contains_key(&heap_id) {
                // Prompting, running, or already done.
                return true;
            }
            state.insert(heap_id, LazyState::Confirming);
        }

        if !gate.confirm(&self.shared.question, &self.shared.remember_key) {
            debug!(heap = %heap_id, "user declined heap-wide value computation");
            self.shared.state.lock().remove(&heap_id);
            self.shared.settled.notify_all();
            return false;
        }

        self.shared.state.lock().insert(heap_id, LazyState::Running);

        let shared = Arc::clone(&self.shared);
        let heap = Arc::clone(heap);
        let progress = Arc::clone(progress);
        let ui = Arc::clone(ui);
        let spawned = thread::Builder::new().name("heapscope-values".into()).spawn(move || {
            // Failure is logged and settled inside the pass.
            let _ = run_pass(&shared, &heap, &progress, Some(&ui));
        });
        if let Err(err) = spawned {
            error!(heap = %heap_id, error = %err, "failed to spawn value computation worker");
            self.shared.state.lock().remove(&heap_id);
            self.shared.settled.notify_all();
            return false;
        }
        true
    }

    /// Synchronous computation without the confirmation gate.
    ///
    /// Blocks behind any in-flight attempt for the same heap instead of
    /// starting a second one; returns once values are available or the
    /// pass failed.
    pub fn compute_immediately(&self, heap: &Arc<dyn Heap>, progress: &Arc<dyn Progress>) -> ModelResult<()> {
        let heap_id = heap.id();
        {
            let mut state = self.shared.state.lock();
            loop {
                match state.get(&heap_id) {
                    Some(LazyState::Available) => return Ok(()),
                    Some(_) => self.shared.settled.wait(&mut state),
                    None => break,
                }
            }
            state.insert(heap_id, LazyState::Running);
        }
        run_pass(&self.shared, heap, progress, None)
    }

    /// Registers `callback` to fire once values for `heap` become
    /// available; fires immediately if they already are. Only a weak
    /// reference is kept, so dropping the owning view unregisters it.
    ///
    /// Availability is checked under the callbacks lock. A settling
    /// pass publishes availability before it drains the callback list
    /// under that same lock, so a registration either lands in the
    /// list the drain will see or observes availability here and fires
    /// inline; it can never fall between the two.
    pub fn notify_when_available(&self, heap: HeapId, callback: &Arc<AvailabilityCallback>) {
        {
            let mut callbacks = self.shared.callbacks.lock();
            if !self.available(heap) {
                let slot = callbacks.entry(heap).or_default();
                slot.retain(|weak| weak.strong_count() > 0);
                slot.push(Arc::downgrade(callback));
                return;
            }
        }
        callback();
    }
}

impl std::fmt::Debug for LazyValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyValues")
            .field("remember_key", &self.shared.remember_key)
            .finish()
    }
}

/// Runs the pass and settles the heap's state. `ui` present means the
/// caller is a background worker and callbacks must be handed to the
/// control thread; absent means the synchronous path, which fires them
/// inline.
fn run_pass(shared: &Arc<LazyShared>, heap: &Arc<dyn Heap>, progress: &Arc<dyn Progress>, ui: Option<&Arc<dyn UiDispatcher>>) -> ModelResult<()> {
    let heap_id = heap.id();
    progress.start();
    let outcome = (shared.compute)(&**heap, &**progress);
    progress.finish();

    match &outcome {
        Ok(()) => {
            shared.state.lock().insert(heap_id, LazyState::Available);
            shared.settled.notify_all();
            fire_callbacks(shared, heap_id, ui);
        }
        Err(err) => {
            error!(heap = %heap_id, error = %err, "heap-wide value computation failed");
            shared.state.lock().remove(&heap_id);
            shared.settled.notify_all();
        }
    }
    outcome
}

fn fire_callbacks(shared: &Arc<LazyShared>, heap: HeapId, ui: Option<&Arc<dyn UiDispatcher>>) {
    let registered = shared.callbacks.lock().remove(&heap).unwrap_or_default();
    for weak in registered {
        let Some(callback) = weak.upgrade() else { continue };
        match ui {
            Some(ui) => ui.run_later(Box::new(move || callback())),
            None => callback(),
        }
    }
}
