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

//! Shared interfaces between the heapscope engine and its embedding
//! application.
//!
//! The engine browses multi-gigabyte heap snapshots without owning the
//! snapshot parser, the widget toolkit, or the user-interaction layer.
//! Everything it needs from those collaborators is expressed here as a
//! small trait: an opaque [`Heap`] handle, a [`Progress`] reporting sink,
//! a [`UiDispatcher`] for handing completed background work back to the
//! control thread, and a [`ConfirmationGate`] asked once before an
//! expensive heap-wide computation starts.

pub mod confirm; // User confirmation before expensive computations
pub mod dispatch; // Control-thread handoff for background results
pub mod heap; // Opaque heap snapshot handle
pub mod ids; // Stable identifiers
pub mod progress; // Long-running computation reporting
pub mod testing; // In-memory collaborator doubles

pub use confirm::{AlwaysConfirm, ConfirmationGate};
pub use dispatch::{ImmediateDispatcher, QueuedDispatcher, UiDispatcher};
pub use heap::{Heap, HeapId};
pub use ids::NodeId;
pub use progress::{NoProgress, Progress};
