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

//! In-memory doubles for the collaborator traits, shared by the unit
//! and integration tests of the engine crates.

use crate::confirm::ConfirmationGate;
use crate::heap::{Heap, HeapId};
use crate::progress::Progress;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Heap handle with nothing behind it but an id.
#[derive(Debug)]
pub struct TestHeap {
    id: HeapId,
}

impl TestHeap {
    pub fn new(id: u64) -> Self {
        Self { id: HeapId(id) }
    }
}

impl Heap for TestHeap {
    fn id(&self) -> HeapId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Progress sink that counts start/finish pairs.
#[derive(Debug, Default)]
pub struct CountingProgress {
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Progress for CountingProgress {
    fn start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn message(&self, _text: &str) {}

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Confirmation gate with a fixed answer that counts how often it was
/// actually asked.
#[derive(Debug)]
pub struct ScriptedGate {
    answer: bool,
    asked: AtomicUsize,
}

impl ScriptedGate {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    /// Number of times the user would have been prompted.
    pub fn prompts(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl ConfirmationGate for ScriptedGate {
    fn confirm(&self, _question: &str, _remember_key: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
