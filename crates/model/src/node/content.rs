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

use crate::value::{Value, ValueTypeId};
use heapscope_common::{Heap, NodeId};
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Domain payload of a tree node.
///
/// Identity is content-based, never placement-based: two contents
/// representing the same heap-graph vertex must be `domain_eq` and hash
/// equal no matter which arena slots or parent chains they sit in. The
/// cycle check and the structural path keys of the children cache both
/// rely on exactly this.
pub trait NodeContent: Send + Sync + 'static {
    /// Content-based hash, consistent with [`NodeContent::domain_eq`].
    fn domain_hash(&self) -> u64;

    /// Content-based equality across arbitrary content types.
    /// Implementations downcast `other` via [`NodeContent::as_any`].
    fn domain_eq(&self, other: &dyn NodeContent) -> bool;

    /// Value this content knows natively, or [`Value::NoValue`] to let
    /// the engine consult lazy machinery and value providers.
    fn value(&self, ty: ValueTypeId, heap: &dyn Heap) -> Value {
        let _ = (ty, heap);
        Value::NoValue
    }

    /// Whether the node can never have children.
    fn is_leaf(&self) -> bool {
        false
    }

    /// Transient markers (progress placeholders, truncation markers)
    /// are never cached and force recomputation when the sort changes.
    fn is_transient(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Folds a `Hash` payload into a `u64` for [`NodeContent::domain_hash`]
/// implementations. A type tag should participate so different content
/// types with equal fields do not collide into equality.
pub fn hash_payload<T: Hash + ?Sized>(tag: &str, payload: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    tag.hash(&mut hasher);
    payload.hash(&mut hasher);
    hasher.finish()
}

/// Content of the synthetic root node of one view.
///
/// Identity is the view id alone, so a root created after a full model
/// refresh compares equal to its predecessor and cached path keys keep
/// resolving.
#[derive(Debug)]
pub struct RootContent {
    view_id: String,
}

impl RootContent {
    pub fn new(view_id: impl Into<String>) -> Self {
        Self { view_id: view_id.into() }
    }

    pub fn view_id(&self) -> &str {
        &self.view_id
    }
}

impl NodeContent for RootContent {
    fn domain_hash(&self) -> u64 {
        hash_payload("root", &self.view_id)
    }

    fn domain_eq(&self, other: &dyn NodeContent) -> bool {
        other
            .as_any()
            .downcast_ref::<RootContent>()
            .is_some_and(|o| o.view_id == self.view_id)
    }

    fn value(&self, ty: ValueTypeId, _heap: &dyn Heap) -> Value {
        match ty {
            ValueTypeId::NAME => Value::Text(self.view_id.clone()),
            _ => Value::NoValue,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Terminal message-only node, used by providers for rows like
/// "no selection".
#[derive(Debug)]
pub struct TextContent {
    text: String,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl NodeContent for TextContent {
    fn domain_hash(&self) -> u64 {
        hash_payload("text", &self.text)
    }

    fn domain_eq(&self, other: &dyn NodeContent) -> bool {
        other
            .as_any()
            .downcast_ref::<TextContent>()
            .is_some_and(|o| o.text == self.text)
    }

    fn value(&self, ty: ValueTypeId, _heap: &dyn Heap) -> Value {
        match ty {
            ValueTypeId::NAME => Value::Text(self.text.clone()),
            _ => Value::Unsupported,
        }
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Transient "still working" node substituted while an expansion runs
/// past its latency budget. Never cached, always a leaf.
#[derive(Debug, Default)]
pub struct ProgressContent;

impl ProgressContent {
    pub fn new() -> Self {
        Self
    }
}

impl NodeContent for ProgressContent {
    fn domain_hash(&self) -> u64 {
        hash_payload("progress", &())
    }

    fn domain_eq(&self, other: &dyn NodeContent) -> bool {
        other.as_any().downcast_ref::<ProgressContent>().is_some()
    }

    fn value(&self, ty: ValueTypeId, _heap: &dyn Heap) -> Value {
        match ty {
            ValueTypeId::NAME => Value::Text("computing...".into()),
            _ => Value::Unsupported,
        }
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn is_transient(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Terminal marker a provider appends when it truncates a long child
/// list. Its presence as the last child tells the engine the list is a
/// sample that must be recomputed when the sort order changes.
#[derive(Debug)]
pub struct MoreNodesContent {
    omitted: usize,
}

impl MoreNodesContent {
    pub fn new(omitted: usize) -> Self {
        Self { omitted }
    }

    pub fn omitted(&self) -> usize {
        self.omitted
    }
}

impl NodeContent for MoreNodesContent {
    fn domain_hash(&self) -> u64 {
        hash_payload("more-nodes", &self.omitted)
    }

    fn domain_eq(&self, other: &dyn NodeContent) -> bool {
        other
            .as_any()
            .downcast_ref::<MoreNodesContent>()
            .is_some_and(|o| o.omitted == self.omitted)
    }

    fn value(&self, ty: ValueTypeId, _heap: &dyn Heap) -> Value {
        match ty {
            ValueTypeId::NAME => Value::Text(format!("{} more nodes...", self.omitted)),
            _ => Value::Unsupported,
        }
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn is_transient(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Terminal marker substituted when expansion would revisit an
/// ancestor.
///
/// Wraps the revisited content so the marker renders with the original
/// values, and records the ancestor the loop closes back to. The engine
/// answers the dedicated `LOOP` / `LOOP_ORIGIN` value slots for it;
/// everything else delegates to the wrapped content. Never expanded.
pub struct LoopContent {
    original: Arc<dyn NodeContent>,
    origin: NodeId,
}

impl LoopContent {
    pub fn new(original: Arc<dyn NodeContent>, origin: NodeId) -> Self {
        Self { original, origin }
    }

    /// The content whose expansion was cut short.
    pub fn original(&self) -> &Arc<dyn NodeContent> {
        &self.original
    }

    /// The ancestor node this loop closes back to.
    pub fn origin(&self) -> NodeId {
        self.origin
    }
}

impl NodeContent for LoopContent {
    fn domain_hash(&self) -> u64 {
        self.original.domain_hash()
    }

    // A loop marker stands for the content it wraps; comparing through
    // to the original keeps cached subtrees containing markers
    // retrievable by structural path.
    fn domain_eq(&self, other: &dyn NodeContent) -> bool {
        match other.as_any().downcast_ref::<LoopContent>() {
            Some(o) => self.original.domain_eq(&*o.original),
            None => self.original.domain_eq(other),
        }
    }

    fn value(&self, ty: ValueTypeId, heap: &dyn Heap) -> Value {
        match ty {
            ValueTypeId::LOOP_ORIGIN => Value::Node(self.origin),
            _ => self.original.value(ty, heap),
        }
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for LoopContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopContent").field("origin", &self.origin).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapscope_common::testing::TestHeap;

    #[test]
    fn text_content_identity_is_the_text() {
        let a = TextContent::new("no selection");
        let b = TextContent::new("no selection");
        let c = TextContent::new("other");
        assert!(a.domain_eq(&b));
        assert_eq!(a.domain_hash(), b.domain_hash());
        assert!(!a.domain_eq(&c));
    }

    #[test]
    fn different_content_types_never_compare_equal() {
        let text = TextContent::new("x");
        let progress = ProgressContent::new();
        assert!(!text.domain_eq(&progress));
        assert!(!progress.domain_eq(&text));
    }

    #[test]
    fn loop_marker_compares_through_to_the_original() {
        let original: Arc<dyn NodeContent> = Arc::new(TextContent::new("obj#12"));
        let marker = LoopContent::new(Arc::clone(&original), NodeId::new(0, 0));
        assert!(marker.domain_eq(&*original));
        assert_eq!(marker.domain_hash(), original.domain_hash());
        assert!(marker.is_leaf());
    }

    #[test]
    fn loop_marker_answers_origin_and_delegates_the_rest() {
        let heap = TestHeap::new(1);
        let original: Arc<dyn NodeContent> = Arc::new(TextContent::new("obj#12"));
        let origin = NodeId::new(4, 0);
        let marker = LoopContent::new(original, origin);

        assert_eq!(marker.value(ValueTypeId::LOOP_ORIGIN, &heap), Value::Node(origin));
        assert_eq!(marker.value(ValueTypeId::NAME, &heap), Value::Text("obj#12".into()));
    }

    #[test]
    fn transient_markers_are_flagged() {
        assert!(ProgressContent::new().is_transient());
        assert!(MoreNodesContent::new(100).is_transient());
        assert!(!TextContent::new("x").is_transient());
    }
}
