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

use std::any::Any;
use std::fmt;

/// Identifies one parsed heap snapshot for the lifetime of the process.
///
/// Heap-scoped state (lazy value availability, notification
/// registrations) is keyed by this id rather than by handle identity,
/// so two views over the same snapshot share one computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(pub u64);

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "heap:{}", self.0)
    }
}

/// Opaque handle over a parsed memory snapshot's object graph.
///
/// The engine never interprets the snapshot itself; it passes the
/// handle through to node and value providers, which downcast via
/// [`Heap::as_any`] to whatever concrete model the embedding
/// application parsed. The handle must be read-only and safely
/// shareable across worker threads.
pub trait Heap: Send + Sync {
    /// Stable identity of this snapshot.
    fn id(&self) -> HeapId;

    /// Access to the concrete snapshot model for providers.
    fn as_any(&self) -> &dyn Any;
}
