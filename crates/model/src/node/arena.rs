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

use crate::node::content::NodeContent;
use crate::value::{Value, ValueTypeId};
use heapscope_common::NodeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolution state of a node's children.
///
/// Attaching is a single slot assignment, so readers observe one of
/// these states atomically, never a partially materialized array.
#[derive(Debug, Clone)]
pub enum ChildrenSlot {
    /// Never computed, or discarded since.
    Unresolved,
    /// Fully materialized; the empty array is the resolved-empty
    /// sentinel. The array is immutable once attached.
    Resolved(Arc<[NodeId]>),
    /// An expansion exceeded its latency budget; `node` is the
    /// transient progress node shown meanwhile and `ticket` identifies
    /// the expansion whose late result may still replace it.
    Placeholder {
        ticket: u64,
        node: NodeId,
        array: Arc<[NodeId]>,
    },
}

/// One materialized node: domain content plus placement.
///
/// `index_in_parent` is meaningful only while the parent's resolved
/// children array holds this node at that index; adoption from the
/// children cache re-stamps both fields together.
pub struct NodeEntry {
    pub content: Arc<dyn NodeContent>,
    pub parent: Option<NodeId>,
    pub index_in_parent: usize,
    pub children: ChildrenSlot,
    /// Memoized value-provider outcomes, created on first foreign
    /// value lookup and discarded with the node.
    pub memo: Option<HashMap<ValueTypeId, Value>>,
}

struct Slot {
    stamp: u32,
    entry: Option<NodeEntry>,
}

/// Slot arena holding every materialized node of one root context.
///
/// Ids are tagged with a per-slot reuse stamp; a stale id whose slot
/// was released (and possibly reoccupied) simply resolves to `None`
/// instead of aliasing the new occupant.
#[derive(Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materializes `content` and returns its id. Placement is stamped
    /// from the caller's perspective.
    pub fn insert(&mut self, content: Arc<dyn NodeContent>, parent: Option<NodeId>, index_in_parent: usize) -> NodeId {
        let entry = NodeEntry {
            content,
            parent,
            index_in_parent,
            children: ChildrenSlot::Unresolved,
            memo: None,
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                NodeId::new(index, slot.stamp)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { stamp: 0, entry: Some(entry) });
                NodeId::new(index, 0)
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeEntry> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.stamp != id.stamp() {
            return None;
        }
        slot.entry.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.stamp != id.stamp() {
            return None;
        }
        slot.entry.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Releases the slot, invalidating every outstanding id for it.
    pub fn release(&mut self, id: NodeId) -> Option<NodeEntry> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.stamp != id.stamp() {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.stamp = slot.stamp.wrapping_add(1);
        self.free.push(id.index());
        Some(entry)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::content::TextContent;

    fn content(text: &str) -> Arc<dyn NodeContent> {
        Arc::new(TextContent::new(text))
    }

    #[test]
    fn insert_and_lookup() {
        let mut arena = NodeArena::new();
        let root = arena.insert(content("root"), None, 0);
        let child = arena.insert(content("child"), Some(root), 0);

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(child).and_then(|e| e.parent), Some(root));
        assert!(matches!(arena.get(root).map(|e| &e.children), Some(ChildrenSlot::Unresolved)));
    }

    #[test]
    fn released_ids_go_stale_even_after_slot_reuse() {
        let mut arena = NodeArena::new();
        let first = arena.insert(content("first"), None, 0);
        assert!(arena.release(first).is_some());
        assert!(!arena.contains(first));

        // The slot is reoccupied, the old id must not resolve to it.
        let second = arena.insert(content("second"), None, 0);
        assert_eq!(second.index(), first.index());
        assert_ne!(second, first);
        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());
    }

    #[test]
    fn double_release_is_a_no_op() {
        let mut arena = NodeArena::new();
        let id = arena.insert(content("x"), None, 0);
        assert!(arena.release(id).is_some());
        assert!(arena.release(id).is_none());
        assert!(arena.is_empty());
    }
}
