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

//! Derived per-node values.
//!
//! A [`ValueType`] describes one column-like datum a node can carry
//! (name, instance count, retained size...), including the sentinels
//! reported when the datum is missing, and, for heap-scoped "lazy"
//! types, the machinery that precomputes the datum for the whole heap
//! on a background worker after a one-time user confirmation.

pub mod lazy; // Heap-wide asynchronous value precomputation
pub mod provider; // Out-of-band value resolution SPI

pub use lazy::{AvailabilityCallback, LazyValues};
pub use provider::ValueProvider;

use crate::error::ModelResult;
use heapscope_common::{ConfirmationGate, Heap, HeapId, NodeId, Progress, UiDispatcher};
use std::sync::Arc;

/// A resolved (or unresolvable) derived value.
///
/// The three unit variants are the sentinels every type declares:
/// `NoValue` means the type applies to this node's kind but this node
/// has none; `Unsupported` means this node's kind never carries the
/// value; `NotAvailable` means the value exists but has not been
/// computed for this heap yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    NoValue,
    Unsupported,
    NotAvailable,
    Int(i64),
    Text(String),
    Node(NodeId),
}

impl Value {
    /// Numeric projection used by sort comparators.
    ///
    /// Sentinels map onto the conventional negative markers (-1 no
    /// value, -2 unsupported, -3 not available) so missing values sort
    /// below every real measurement. Non-numeric payloads yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::NoValue => Some(-1),
            Value::Unsupported => Some(-2),
            Value::NotAvailable => Some(-3),
            Value::Text(_) | Value::Node(_) => None,
        }
    }

    /// Text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Node reference payload, if this is a node value.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// True for any of the three sentinel variants.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::NoValue | Value::Unsupported | Value::NotAvailable)
    }
}

/// Payload kind a [`ValueType`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Text,
    NodeRef,
}

/// Identifies one value type across the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueTypeId(pub &'static str);

impl ValueTypeId {
    /// Display name of the node.
    pub const NAME: ValueTypeId = ValueTypeId("name");
    /// Number of aggregated instances.
    pub const COUNT: ValueTypeId = ValueTypeId("count");
    /// Shallow size in bytes.
    pub const OWN_SIZE: ValueTypeId = ValueTypeId("own-size");
    /// Retained size in bytes; heap-wide lazy computation.
    pub const RETAINED_SIZE: ValueTypeId = ValueTypeId("retained-size");
    /// Set on loop marker nodes; resolves to the marker itself.
    pub const LOOP: ValueTypeId = ValueTypeId("loop");
    /// Set on loop marker nodes; resolves to the ancestor the loop
    /// closes back to.
    pub const LOOP_ORIGIN: ValueTypeId = ValueTypeId("loop-origin");
}

/// Describes one derived per-node value.
///
/// Cheap to clone; all instances of one logical type share state, so a
/// lazy type's per-heap computation is shared across every view that
/// renders it.
#[derive(Clone)]
pub struct ValueType {
    inner: Arc<ValueTypeInner>,
}

struct ValueTypeInner {
    id: ValueTypeId,
    label: &'static str,
    kind: ValueKind,
    lazy: Option<LazyValues>,
}

impl ValueType {
    /// A type whose values resolve synchronously from the node itself
    /// or a [`ValueProvider`].
    pub fn plain(id: ValueTypeId, label: &'static str, kind: ValueKind) -> Self {
        Self {
            inner: Arc::new(ValueTypeInner { id, label, kind, lazy: None }),
        }
    }

    /// A type whose values require a heap-wide precomputation pass
    /// before any node can resolve them.
    pub fn lazy(id: ValueTypeId, label: &'static str, kind: ValueKind, lazy: LazyValues) -> Self {
        Self {
            inner: Arc::new(ValueTypeInner {
                id,
                label,
                kind,
                lazy: Some(lazy),
            }),
        }
    }

    pub fn id(&self) -> ValueTypeId {
        self.inner.id
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    pub fn kind(&self) -> ValueKind {
        self.inner.kind
    }

    pub fn is_lazy(&self) -> bool {
        self.inner.lazy.is_some()
    }

    /// Lazy computation machinery, if this type has one.
    pub fn lazy_values(&self) -> Option<&LazyValues> {
        self.inner.lazy.as_ref()
    }

    /// Whether values of this type can be resolved for `heap` right
    /// now. Plain types are always available.
    pub fn values_available(&self, heap: HeapId) -> bool {
        match &self.inner.lazy {
            Some(lazy) => lazy.available(heap),
            None => true,
        }
    }

    /// Starts the heap-wide computation for `heap` after asking the
    /// user through `gate`, unless it already ran or is running.
    ///
    /// Returns true if values are, or will become, available; false if
    /// the user declined. Plain types report true without prompting.
    pub fn compute_values(&self, heap: &Arc<dyn Heap>, gate: &dyn ConfirmationGate, progress: &Arc<dyn Progress>, ui: &Arc<dyn UiDispatcher>) -> bool {
        match &self.inner.lazy {
            Some(lazy) => lazy.compute(heap, gate, progress, ui),
            None => true,
        }
    }

    /// Runs the heap-wide computation synchronously, skipping the
    /// confirmation gate. For callers that already obtained consent.
    pub fn compute_values_immediately(&self, heap: &Arc<dyn Heap>, progress: &Arc<dyn Progress>) -> ModelResult<()> {
        match &self.inner.lazy {
            Some(lazy) => lazy.compute_immediately(heap, progress),
            None => Ok(()),
        }
    }

    /// Registers a weakly-held callback fired once values for `heap`
    /// become available. Callbacks whose owner dropped are pruned, so
    /// a closed view does not leak its registration.
    pub fn notify_when_available(&self, heap: HeapId, callback: &Arc<AvailabilityCallback>) {
        if let Some(lazy) = &self.inner.lazy {
            lazy.notify_when_available(heap, callback);
        }
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ValueType {}

impl std::fmt::Debug for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueType")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("lazy", &self.is_lazy())
            .finish()
    }
}

/// The value types one root context can resolve.
///
/// The embedding application builds the registry once per view family
/// and injects it at root creation; there is no global lookup.
#[derive(Clone, Default)]
pub struct ValueTypeRegistry {
    types: Vec<ValueType>,
}

impl ValueTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard synchronous types: name, count, own
    /// size, and the two loop marker slots.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ValueType::plain(ValueTypeId::NAME, "Name", ValueKind::Text));
        registry.register(ValueType::plain(ValueTypeId::COUNT, "Count", ValueKind::Int));
        registry.register(ValueType::plain(ValueTypeId::OWN_SIZE, "Size", ValueKind::Int));
        registry.register(ValueType::plain(ValueTypeId::LOOP, "Loop", ValueKind::NodeRef));
        registry.register(ValueType::plain(ValueTypeId::LOOP_ORIGIN, "Loop Origin", ValueKind::NodeRef));
        registry
    }

    /// Adds `ty`, replacing any previously registered type with the
    /// same id.
    pub fn register(&mut self, ty: ValueType) {
        self.types.retain(|t| t.id() != ty.id());
        self.types.push(ty);
    }

    pub fn get(&self, id: ValueTypeId) -> Option<&ValueType> {
        self.types.iter().find(|t| t.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueType> {
        self.types.iter()
    }
}
