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

//! End-to-end behavior of the lazy materialization engine: providers,
//! scheduler, cache, cycles, values.

use heapscope_common::testing::{ScriptedGate, TestHeap};
use heapscope_common::{Heap, NoProgress, NodeId, Progress, QueuedDispatcher, UiDispatcher};
use heapscope_model::node::content::hash_payload;
use heapscope_model::{
    CacheConfig, ChildrenState, ExpansionContext, LazyValues, MoreNodesContent, NodeContent, NodeProvider, ProviderRegistry, RootConfig, RootContext, RootListener, RootContent,
    SchedulerConfig, Value, ValueKind, ValueProvider, ValueType, ValueTypeId, ValueTypeRegistry,
};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Aggregated class row, the typical domain payload of a heap view.
struct ClassContent {
    name: &'static str,
}

impl ClassContent {
    fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl NodeContent for ClassContent {
    fn domain_hash(&self) -> u64 {
        hash_payload("class", self.name)
    }

    fn domain_eq(&self, other: &dyn NodeContent) -> bool {
        match other.as_any().downcast_ref::<ClassContent>() {
            Some(other) => self.name == other.name,
            None => false,
        }
    }

    fn value(&self, ty: ValueTypeId, _heap: &dyn Heap) -> Value {
        if ty == ValueTypeId::NAME { Value::Text(self.name.into()) } else { Value::NoValue }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

enum Child {
    Class(&'static str),
    More(usize),
}

/// Provider over a scripted name -> children table. The synthetic root
/// content maps to the `"<root>"` key. Counts invocations and can be
/// slowed down to overrun the latency budget.
struct TableProvider {
    table: HashMap<&'static str, Vec<Child>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl TableProvider {
    fn new(edges: Vec<(&'static str, Vec<Child>)>) -> Self {
        Self {
            table: edges.into_iter().collect(),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn key_of(parent: &dyn NodeContent) -> Option<&'static str> {
        if parent.as_any().is::<RootContent>() {
            return Some("<root>");
        }
        parent.as_any().downcast_ref::<ClassContent>().map(|c| c.name)
    }
}

impl NodeProvider for TableProvider {
    fn name(&self) -> &str {
        "table"
    }

    fn supports_view(&self, _heap: &dyn Heap, _view_id: &str) -> bool {
        true
    }

    fn provide_children(&self, parent: &dyn NodeContent, _ctx: &ExpansionContext) -> heapscope_model::ModelResult<Vec<Arc<dyn NodeContent>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let children = Self::key_of(parent)
            .and_then(|key| self.table.get(key))
            .map(|specs| {
                specs
                    .iter()
                    .map(|spec| match spec {
                        Child::Class(name) => Arc::new(ClassContent::new(name)) as Arc<dyn NodeContent>,
                        Child::More(omitted) => Arc::new(MoreNodesContent::new(*omitted)) as Arc<dyn NodeContent>,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(children)
    }
}

#[derive(Default)]
struct RecordingListener {
    changed: Mutex<Vec<NodeId>>,
}

impl RootListener for RecordingListener {
    fn children_changed(&self, node: NodeId) {
        self.changed.lock().push(node);
    }
}

fn build_root(provider: Arc<TableProvider>) -> RootContext {
    RootContext::builder("classes", Arc::new(TestHeap::new(1)))
        .providers(ProviderRegistry::new().with_node_provider(provider))
        .build()
}

#[test]
fn children_materialize_once() {
    init_tracing();
    let provider = Arc::new(TableProvider::new(vec![("<root>", vec![Child::Class("A"), Child::Class("B")])]));
    let root = build_root(Arc::clone(&provider));

    let first = root.children(root.root_node());
    let second = root.children(root.root_node());

    assert_eq!(first.len(), 2);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.calls(), 1);
    assert_eq!(root.get_value(first[0], ValueTypeId::NAME), Value::Text("A".into()));
    assert_eq!(root.index_of_child(root.root_node(), first[1]), Some(1));
    assert_eq!(root.parent(first[0]), Some(root.root_node()));
    root.tear_down();
}

#[test]
fn collapse_parks_children_for_readoption() {
    init_tracing();
    let provider = Arc::new(TableProvider::new(vec![
        ("<root>", vec![Child::Class("A")]),
        ("A", vec![Child::Class("A1"), Child::Class("A2")]),
    ]));
    let root = build_root(Arc::clone(&provider));

    let top = root.children(root.root_node());
    let a = top[0];
    let before = root.children(a);
    assert_eq!(provider.calls(), 2);

    root.collapse(a);
    assert_eq!(root.children_state(a), ChildrenState::Unresolved);

    let after = root.children(a);
    assert!(Arc::ptr_eq(&before, &after), "cached subtree must be re-adopted verbatim");
    assert_eq!(provider.calls(), 2, "re-expansion must not consult providers");
    assert_eq!(root.get_value(after[1], ValueTypeId::NAME), Value::Text("A2".into()));
    root.tear_down();
}

#[test]
fn evicted_subtrees_recompute_through_providers() {
    init_tracing();
    let provider = Arc::new(TableProvider::new(vec![
        ("<root>", vec![Child::Class("A"), Child::Class("B")]),
        ("A", vec![Child::Class("A1")]),
        ("B", vec![Child::Class("B1")]),
    ]));
    let root = RootContext::builder("classes", Arc::new(TestHeap::new(1)))
        .providers(ProviderRegistry::new().with_node_provider(Arc::clone(&provider) as Arc<dyn NodeProvider>))
        .config(RootConfig {
            cache: CacheConfig::default().with_max_entries(1),
            ..RootConfig::default()
        })
        .build();

    let top = root.children(root.root_node());
    let (a, b) = (top[0], top[1]);
    root.children(a);
    root.children(b);
    assert_eq!(provider.calls(), 3);

    root.collapse(a);
    root.collapse(b); // evicts the parked subtree of `a`

    let b_again = root.children(b);
    assert_eq!(provider.calls(), 3, "surviving cache entry answers without providers");
    assert_eq!(b_again.len(), 1);

    let a_again = root.children(a);
    assert_eq!(provider.calls(), 4, "evicted subtree goes back through providers");
    assert_eq!(root.get_value(a_again[0], ValueTypeId::NAME), Value::Text("A1".into()));
    root.tear_down();
}

#[test]
fn cycles_end_in_loop_markers() {
    init_tracing();
    let provider = Arc::new(TableProvider::new(vec![
        ("<root>", vec![Child::Class("A")]),
        ("A", vec![Child::Class("B")]),
        ("B", vec![Child::Class("A")]),
    ]));
    let root = build_root(provider);

    let a = root.children(root.root_node())[0];
    let b = root.children(a)[0];
    let closing = root.children(b);
    assert_eq!(closing.len(), 1);
    let marker = closing[0];

    assert!(root.is_leaf(marker), "loop markers terminate the walk");
    assert_eq!(root.get_value(marker, ValueTypeId::LOOP), Value::Node(marker));
    assert_eq!(root.get_value(marker, ValueTypeId::LOOP_ORIGIN), Value::Node(a));
    assert_eq!(root.get_value(marker, ValueTypeId::NAME), Value::Text("A".into()), "markers render as the node they stand for");
    assert_eq!(root.get_value(b, ValueTypeId::LOOP), Value::NoValue);
    root.tear_down();
}

#[test]
fn slow_expansion_yields_placeholder_then_attaches() {
    init_tracing();
    let provider = Arc::new(TableProvider::new(vec![("<root>", vec![Child::Class("A")])]).delayed(Duration::from_millis(80)));
    let dispatcher = Arc::new(QueuedDispatcher::new());
    let listener = Arc::new(RecordingListener::default());
    let root = RootContext::builder("classes", Arc::new(TestHeap::new(1)))
        .providers(ProviderRegistry::new().with_node_provider(provider))
        .dispatcher(Arc::clone(&dispatcher) as Arc<dyn UiDispatcher>)
        .config(RootConfig {
            scheduler: SchedulerConfig::default().with_workers(1).with_latency_budget(Duration::from_millis(5)),
            ..RootConfig::default()
        })
        .build();
    root.set_listener(Some(Arc::clone(&listener) as Arc<dyn RootListener>));

    let placeholder = root.children(root.root_node());
    assert_eq!(placeholder.len(), 1);
    assert_eq!(root.children_state(root.root_node()), ChildrenState::Pending);
    let content = root.content(placeholder[0]).expect("placeholder node present");
    assert!(content.is_transient());

    std::thread::sleep(Duration::from_millis(200));
    dispatcher.drain();

    assert_eq!(root.children_state(root.root_node()), ChildrenState::Resolved(1));
    assert_eq!(*listener.changed.lock(), vec![root.root_node()]);
    let real = root.children(root.root_node());
    assert_eq!(root.get_value(real[0], ValueTypeId::NAME), Value::Text("A".into()));
    assert!(root.content(placeholder[0]).is_none(), "placeholder slot is reclaimed");
    root.tear_down();
}

#[test]
fn reset_makes_late_results_stale() {
    init_tracing();
    let provider = Arc::new(TableProvider::new(vec![("<root>", vec![Child::Class("A")])]).delayed(Duration::from_millis(80)));
    let dispatcher = Arc::new(QueuedDispatcher::new());
    let listener = Arc::new(RecordingListener::default());
    let root = RootContext::builder("classes", Arc::new(TestHeap::new(1)))
        .providers(ProviderRegistry::new().with_node_provider(provider))
        .dispatcher(Arc::clone(&dispatcher) as Arc<dyn UiDispatcher>)
        .config(RootConfig {
            scheduler: SchedulerConfig::default().with_workers(1).with_latency_budget(Duration::from_millis(5)),
            ..RootConfig::default()
        })
        .build();
    root.set_listener(Some(Arc::clone(&listener) as Arc<dyn RootListener>));

    root.children(root.root_node());
    assert_eq!(root.children_state(root.root_node()), ChildrenState::Pending);

    root.reset(false);
    std::thread::sleep(Duration::from_millis(200));
    dispatcher.drain();

    assert_eq!(root.children_state(root.root_node()), ChildrenState::Unresolved, "stale result must not attach");
    assert!(listener.changed.lock().is_empty());
    root.tear_down();
}

#[test]
fn sampled_children_recompute_when_sort_changes() {
    init_tracing();
    let provider = Arc::new(TableProvider::new(vec![
        ("<root>", vec![Child::Class("A"), Child::Class("B")]),
        ("A", vec![Child::Class("A1"), Child::More(5)]),
        ("B", vec![Child::Class("B1")]),
    ]));
    let root = build_root(Arc::clone(&provider));

    let top = root.children(root.root_node());
    let (a, b) = (top[0], top[1]);
    root.children(a);
    root.children(b);
    assert_eq!(provider.calls(), 3);

    root.will_be_sorted(root.root_node());

    assert_eq!(root.children_state(root.root_node()), ChildrenState::Resolved(2), "complete lists stay attached");
    assert_eq!(root.children_state(b), ChildrenState::Resolved(1));
    assert_eq!(root.children_state(a), ChildrenState::Unresolved, "sampled list is discarded");

    root.children(a);
    assert_eq!(provider.calls(), 4, "discarded sample recomputes under the new order");
    root.tear_down();
}

/// Hands one child to every node it sees, loop markers included if
/// the engine ever let it.
struct EagerProvider;

impl NodeProvider for EagerProvider {
    fn name(&self) -> &str {
        "eager"
    }

    fn supports_view(&self, _heap: &dyn Heap, _view_id: &str) -> bool {
        true
    }

    fn provide_children(&self, _parent: &dyn NodeContent, _ctx: &ExpansionContext) -> heapscope_model::ModelResult<Vec<Arc<dyn NodeContent>>> {
        Ok(vec![Arc::new(ClassContent::new("X"))])
    }
}

#[test]
fn terminal_markers_take_no_children_from_providers() {
    init_tracing();
    let root = RootContext::builder("classes", Arc::new(TestHeap::new(1)))
        .providers(ProviderRegistry::new().with_node_provider(Arc::new(EagerProvider)))
        .build();

    let x = root.children(root.root_node())[0];
    let marker = root.children(x)[0];
    assert_eq!(root.get_value(marker, ValueTypeId::LOOP), Value::Node(marker));

    let expanded = root.children(marker);
    assert!(expanded.is_empty(), "loop markers stay terminal");
    assert!(root.is_leaf(marker));
    root.tear_down();
}

#[test]
fn pending_expansion_is_discarded_when_sort_changes() {
    init_tracing();
    let provider = Arc::new(TableProvider::new(vec![("<root>", vec![Child::Class("A")])]).delayed(Duration::from_millis(80)));
    let dispatcher = Arc::new(QueuedDispatcher::new());
    let listener = Arc::new(RecordingListener::default());
    let root = RootContext::builder("classes", Arc::new(TestHeap::new(1)))
        .providers(ProviderRegistry::new().with_node_provider(provider))
        .dispatcher(Arc::clone(&dispatcher) as Arc<dyn UiDispatcher>)
        .config(RootConfig {
            scheduler: SchedulerConfig::default().with_workers(1).with_latency_budget(Duration::from_millis(5)),
            ..RootConfig::default()
        })
        .build();
    root.set_listener(Some(Arc::clone(&listener) as Arc<dyn RootListener>));

    root.children(root.root_node());
    assert_eq!(root.children_state(root.root_node()), ChildrenState::Pending);

    root.will_be_sorted(root.root_node());
    assert_eq!(root.children_state(root.root_node()), ChildrenState::Unresolved, "a pending list counts as sampled");

    std::thread::sleep(Duration::from_millis(200));
    dispatcher.drain();

    assert_eq!(root.children_state(root.root_node()), ChildrenState::Unresolved, "result computed under the old order must not attach");
    assert!(listener.changed.lock().is_empty());
    root.tear_down();
}

/// Answers a fixed number for every class row, counting lookups.
struct SizeProvider {
    ty: ValueTypeId,
    answer: i64,
    calls: AtomicUsize,
}

impl SizeProvider {
    fn new(ty: ValueTypeId, answer: i64) -> Self {
        Self { ty, answer, calls: AtomicUsize::new(0) }
    }
}

impl ValueProvider for SizeProvider {
    fn value_for(&self, content: &dyn NodeContent, ty: &ValueType, _heap: &dyn Heap) -> Option<Value> {
        if ty.id() != self.ty || !content.as_any().is::<ClassContent>() {
            return None;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(Value::Int(self.answer))
    }
}

#[test]
fn foreign_values_resolve_once_per_node() {
    init_tracing();
    let node_provider = Arc::new(TableProvider::new(vec![("<root>", vec![Child::Class("A")])]));
    let size_provider = Arc::new(SizeProvider::new(ValueTypeId::OWN_SIZE, 42));
    let root = RootContext::builder("classes", Arc::new(TestHeap::new(1)))
        .providers(
            ProviderRegistry::new()
                .with_node_provider(node_provider)
                .with_value_provider(Arc::clone(&size_provider) as Arc<dyn ValueProvider>),
        )
        .build();

    let a = root.children(root.root_node())[0];
    assert_eq!(root.get_value(a, ValueTypeId::OWN_SIZE), Value::Int(42));
    assert_eq!(root.get_value(a, ValueTypeId::OWN_SIZE), Value::Int(42));
    assert_eq!(size_provider.calls.load(Ordering::SeqCst), 1, "outcome is memoized per node");

    assert_eq!(root.get_value(a, ValueTypeId::NAME), Value::Text("A".into()), "native values bypass providers");
    assert_eq!(root.get_value(a, ValueTypeId::COUNT), Value::NotAvailable, "no provider, no memoized surprise");
    root.tear_down();
}

#[test]
fn lazy_values_stay_unavailable_until_computed() {
    init_tracing();
    let node_provider = Arc::new(TableProvider::new(vec![("<root>", vec![Child::Class("A")])]));
    let retained_provider = Arc::new(SizeProvider::new(ValueTypeId::RETAINED_SIZE, 7));

    let mut values = ValueTypeRegistry::standard();
    values.register(ValueType::lazy(
        ValueTypeId::RETAINED_SIZE,
        "Retained Size",
        ValueKind::Int,
        LazyValues::new("Compute retained sizes? This may take a while.", "retained-sizes", |_heap: &dyn Heap, _progress: &dyn Progress| Ok(())),
    ));

    let heap: Arc<dyn Heap> = Arc::new(TestHeap::new(1));
    let root = RootContext::builder("classes", Arc::clone(&heap))
        .providers(
            ProviderRegistry::new()
                .with_node_provider(node_provider)
                .with_value_provider(retained_provider as Arc<dyn ValueProvider>),
        )
        .value_types(values)
        .build();

    let a = root.children(root.root_node())[0];
    assert_eq!(root.get_value(a, ValueTypeId::RETAINED_SIZE), Value::NotAvailable);

    let retained = root.value_type(ValueTypeId::RETAINED_SIZE).expect("registered type");

    // A declined confirmation leaves the pass idle.
    let declined = ScriptedGate::answering(false);
    assert!(!retained.compute_values(&heap, &declined, &(Arc::new(NoProgress) as Arc<dyn Progress>), &(Arc::new(heapscope_common::ImmediateDispatcher) as Arc<dyn UiDispatcher>)));
    assert_eq!(declined.prompts(), 1);
    assert_eq!(root.get_value(a, ValueTypeId::RETAINED_SIZE), Value::NotAvailable);

    // The synchronous variant skips the gate entirely.
    retained
        .compute_values_immediately(&heap, &(Arc::new(NoProgress) as Arc<dyn Progress>))
        .expect("computation succeeds");
    assert!(retained.values_available(heap.id()));
    assert_eq!(root.get_value(a, ValueTypeId::RETAINED_SIZE), Value::Int(7));
    root.tear_down();
}
