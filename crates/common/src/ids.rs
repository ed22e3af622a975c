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

use std::fmt;

/// Stable identifier of a presentation-tree node.
///
/// Nodes live in a slot arena owned by their root context. A `NodeId`
/// carries the slot index together with a reuse stamp, so an id that
/// survived a slot being released and reoccupied can never be confused
/// with the slot's new occupant. Equality of two `NodeId`s means "the
/// same slot occupancy", not "the same logical heap object"; domain
/// equality is a property of node content, not of arena placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    stamp: u32,
}

impl NodeId {
    /// Builds an id from a slot index and its current reuse stamp.
    pub fn new(index: u32, stamp: u32) -> Self {
        Self { index, stamp }
    }

    /// Slot index within the owning arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Reuse stamp of the slot at the time this id was handed out.
    pub fn stamp(&self) -> u32 {
        self.stamp
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}#{}", self.index, self.stamp)
    }
}
