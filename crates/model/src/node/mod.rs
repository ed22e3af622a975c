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

//! The structural unit of the presentation tree.
//!
//! Node *content* carries the domain payload and its content-based
//! identity; node *placement* (parent link, index, children slot) lives
//! in an arena owned by the root context, so parent pointers are plain
//! indices and a whole subtree can be dropped or rematerialized without
//! reference-chasing.

pub mod arena; // Slot arena and the children-slot state machine
pub mod content; // Domain payload trait and built-in contents

pub use arena::{ChildrenSlot, NodeArena, NodeEntry};
pub use content::{LoopContent, MoreNodesContent, NodeContent, ProgressContent, RootContent, TextContent};
