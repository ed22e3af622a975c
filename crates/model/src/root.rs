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

//! Per-view root context.
//!
//! One `RootContext` exists per logical view ("dominator tree",
//! "instances by class"...). It owns the node arena, the children
//! cache, the expansion scheduler, and the provider lists resolved once
//! for its heap and view id, and it exposes the tree-model surface the
//! embedding widget consumes: `children`, `is_leaf`, `parent`,
//! `index_of_child`, `get_value`, `will_be_sorted`.

use crate::cache::{CacheConfig, ChildrenCache, PathKey};
use crate::node::arena::{ChildrenSlot, NodeArena};
use crate::node::content::{LoopContent, NodeContent, ProgressContent, RootContent};
use crate::provider::{ExpansionContext, NodeFilter, NodeProvider, ProviderRegistry, SortOrder};
use crate::scheduler::{ExpansionResult, ExpansionScheduler, ExpansionState, SchedulerConfig};
use crate::value::{Value, ValueProvider, ValueType, ValueTypeId, ValueTypeRegistry};
use heapscope_common::{Heap, ImmediateDispatcher, NoProgress, NodeId, Progress, UiDispatcher};
use parking_lot::Mutex;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, warn};

/// Observer of asynchronous tree changes, typically the embedding
/// widget. Invoked on the control thread via the injected dispatcher.
pub trait RootListener: Send + Sync {
    /// `node`'s children were replaced after a late expansion result.
    fn children_changed(&self, node: NodeId);
}

/// Summary of a node's children slot, mainly for tests and
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildrenState {
    Unresolved,
    /// An expansion timed out; a placeholder is showing.
    Pending,
    Resolved(usize),
}

/// Root context tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootConfig {
    pub scheduler: SchedulerConfig,
    pub cache: CacheConfig,
}

/// Assembles a [`RootContext`]. Collaborators not supplied fall back
/// to inert defaults (immediate dispatch, no progress reporting, no
/// filter, empty provider registry, standard value types).
pub struct RootBuilder {
    view_id: String,
    heap: Arc<dyn Heap>,
    registry: ProviderRegistry,
    values: ValueTypeRegistry,
    ui: Arc<dyn UiDispatcher>,
    progress: Arc<dyn Progress>,
    filter: Option<Arc<dyn NodeFilter>>,
    sort: Vec<SortOrder>,
    config: RootConfig,
}

impl RootBuilder {
    pub fn providers(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn value_types(mut self, values: ValueTypeRegistry) -> Self {
        self.values = values;
        self
    }

    pub fn dispatcher(mut self, ui: Arc<dyn UiDispatcher>) -> Self {
        self.ui = ui;
        self
    }

    pub fn progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn filter(mut self, filter: Arc<dyn NodeFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: Vec<SortOrder>) -> Self {
        self.sort = sort;
        self
    }

    pub fn config(mut self, config: RootConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> RootContext {
        let mut arena = NodeArena::new();
        let root = arena.insert(Arc::new(RootContent::new(self.view_id.clone())), None, 0);
        RootContext {
            inner: Arc::new(RootInner {
                view_id: self.view_id,
                heap: self.heap,
                registry: self.registry,
                node_providers: OnceLock::new(),
                value_providers: OnceLock::new(),
                values: self.values,
                filter: self.filter,
                sort: Mutex::new(self.sort),
                tree: Mutex::new(TreeState { arena, root }),
                cache: ChildrenCache::new(self.config.cache),
                scheduler: ExpansionScheduler::new(self.config.scheduler),
                ui: self.ui,
                progress: self.progress,
                listener: Mutex::new(None),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }
}

struct TreeState {
    arena: NodeArena,
    root: NodeId,
}

struct RootInner {
    view_id: String,
    heap: Arc<dyn Heap>,
    registry: ProviderRegistry,
    node_providers: OnceLock<Vec<Arc<dyn NodeProvider>>>,
    value_providers: OnceLock<Vec<Arc<dyn ValueProvider>>>,
    values: ValueTypeRegistry,
    filter: Option<Arc<dyn NodeFilter>>,
    sort: Mutex<Vec<SortOrder>>,
    tree: Mutex<TreeState>,
    cache: ChildrenCache,
    scheduler: ExpansionScheduler,
    ui: Arc<dyn UiDispatcher>,
    progress: Arc<dyn Progress>,
    listener: Mutex<Option<Arc<dyn RootListener>>>,
    next_ticket: AtomicU64,
}

/// Handle on one view's lazily materialized tree.
///
/// Cheap to clone; equality and hashing follow the view id alone, so a
/// replacement root created after a model refresh stands in for its
/// predecessor.
#[derive(Clone)]
pub struct RootContext {
    inner: Arc<RootInner>,
}

impl PartialEq for RootContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.view_id == other.inner.view_id
    }
}

impl Eq for RootContext {}

impl Hash for RootContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.view_id.hash(state);
    }
}

impl std::fmt::Debug for RootContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootContext").field("view_id", &self.inner.view_id).finish()
    }
}

impl RootContext {
    pub fn builder(view_id: impl Into<String>, heap: Arc<dyn Heap>) -> RootBuilder {
        RootBuilder {
            view_id: view_id.into(),
            heap,
            registry: ProviderRegistry::new(),
            values: ValueTypeRegistry::standard(),
            ui: Arc::new(ImmediateDispatcher),
            progress: Arc::new(NoProgress),
            filter: None,
            sort: Vec::new(),
            config: RootConfig::default(),
        }
    }

    pub fn view_id(&self) -> &str {
        &self.inner.view_id
    }

    pub fn heap(&self) -> &Arc<dyn Heap> {
        &self.inner.heap
    }

    /// The synthetic root node of this view.
    pub fn root_node(&self) -> NodeId {
        self.inner.tree.lock().root
    }

    pub fn set_listener(&self, listener: Option<Arc<dyn RootListener>>) {
        *self.inner.listener.lock() = listener;
    }

    pub fn sort(&self) -> Vec<SortOrder> {
        self.inner.sort.lock().clone()
    }

    /// Installs the new sort order. [`RootContext::will_be_sorted`]
    /// must already have run for affected nodes.
    pub fn set_sort(&self, sort: Vec<SortOrder>) {
        *self.inner.sort.lock() = sort;
    }

    pub fn value_type(&self, id: ValueTypeId) -> Option<ValueType> {
        self.inner.values.get(id).cloned()
    }

    /// Domain content of a node.
    pub fn content(&self, id: NodeId) -> Option<Arc<dyn NodeContent>> {
        self.inner.tree.lock().arena.get(id).map(|e| Arc::clone(&e.content))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.tree.lock().arena.get(id).and_then(|e| e.parent)
    }

    /// Position of `child` within `parent`'s resolved children.
    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        let tree = self.inner.tree.lock();
        match &tree.arena.get(parent)?.children {
            ChildrenSlot::Resolved(arr) | ChildrenSlot::Placeholder { array: arr, .. } => arr.iter().position(|c| *c == child),
            ChildrenSlot::Unresolved => None,
        }
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        let tree = self.inner.tree.lock();
        match tree.arena.get(id) {
            Some(entry) => {
                entry.content.is_leaf()
                    || matches!(&entry.children, ChildrenSlot::Resolved(arr) if arr.is_empty())
            }
            None => true,
        }
    }

    /// Children slot summary, without triggering materialization.
    pub fn children_state(&self, id: NodeId) -> ChildrenState {
        let tree = self.inner.tree.lock();
        match tree.arena.get(id).map(|e| &e.children) {
            Some(ChildrenSlot::Resolved(arr)) => ChildrenState::Resolved(arr.len()),
            Some(ChildrenSlot::Placeholder { .. }) => ChildrenState::Pending,
            _ => ChildrenState::Unresolved,
        }
    }

    /// The node's children, materializing them on first access.
    ///
    /// Resolution order: the already-resolved array verbatim, a cached
    /// subtree adopted by structural path, or provider-produced
    /// children computed on a worker. The call blocks at most the
    /// scheduler's latency budget; past it, a single transient progress
    /// node is returned and the real children are attached whenever the
    /// worker finishes.
    pub fn children(&self, id: NodeId) -> Arc<[NodeId]> {
        // Idempotent fast path.
        let key = {
            let tree = self.inner.tree.lock();
            let Some(entry) = tree.arena.get(id) else { return no_children() };
            match &entry.children {
                ChildrenSlot::Resolved(arr) => return Arc::clone(arr),
                ChildrenSlot::Placeholder { array, .. } => return Arc::clone(array),
                ChildrenSlot::Unresolved => {
                    // Loop markers, progress and truncation nodes are
                    // terminal no matter what providers claim.
                    if entry.content.is_leaf() {
                        return no_children();
                    }
                    PathKey::for_node(&tree.arena, id)
                }
            }
        };
        let Some(key) = key else { return no_children() };

        if let Some(cached) = self.inner.cache.retrieve(&key) {
            debug!(node = %id, depth = key.depth(), "adopting cached subtree");
            return self.adopt(id, cached);
        }

        self.expand(id)
    }

    /// Re-attaches a cached children array: re-stamps every child's
    /// parent link and index, then resolves the slot, both visible to
    /// the caller as one step.
    fn adopt(&self, id: NodeId, children: Arc<[NodeId]>) -> Arc<[NodeId]> {
        let mut tree = self.inner.tree.lock();
        match tree.arena.get(id).map(|e| &e.children) {
            Some(ChildrenSlot::Unresolved) => {}
            // Raced with another resolution; the cache entry was
            // already consumed, so hand back what won.
            Some(ChildrenSlot::Resolved(arr)) => return Arc::clone(arr),
            Some(ChildrenSlot::Placeholder { array, .. }) => return Arc::clone(array),
            None => return no_children(),
        }
        for (index, child) in children.iter().enumerate() {
            if let Some(entry) = tree.arena.get_mut(*child) {
                entry.parent = Some(id);
                entry.index_in_parent = index;
            }
        }
        if let Some(entry) = tree.arena.get_mut(id) {
            entry.children = ChildrenSlot::Resolved(Arc::clone(&children));
        }
        children
    }

    /// Provider-path expansion through the background scheduler.
    fn expand(&self, id: NodeId) -> Arc<[NodeId]> {
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;

        let (parent_content, placeholder_array) = {
            let mut tree = self.inner.tree.lock();
            let Some(entry) = tree.arena.get(id) else { return no_children() };
            if !matches!(entry.children, ChildrenSlot::Unresolved) {
                // Raced; fall back to the fast path outcome.
                drop(tree);
                return self.children(id);
            }
            let parent_content = Arc::clone(&entry.content);
            let placeholder = tree.arena.insert(Arc::new(ProgressContent::new()), Some(id), 0);
            let array: Arc<[NodeId]> = Arc::from(vec![placeholder]);
            if let Some(entry) = tree.arena.get_mut(id) {
                entry.children = ChildrenSlot::Placeholder {
                    ticket,
                    node: placeholder,
                    array: Arc::clone(&array),
                };
            }
            (parent_content, array)
        };

        let providers: Vec<Arc<dyn NodeProvider>> = self
            .resolved_node_providers()
            .iter()
            .filter(|p| p.supports_node(&*parent_content))
            .cloned()
            .collect();
        let ctx = ExpansionContext {
            heap: Arc::clone(&self.inner.heap),
            view_id: self.inner.view_id.clone(),
            filter: self.inner.filter.clone(),
            sort: self.inner.sort.lock().clone(),
            progress: Arc::clone(&self.inner.progress),
        };

        let work = {
            let parent_content = Arc::clone(&parent_content);
            move || -> ExpansionResult {
                ctx.progress.start();
                let mut produced: Vec<Arc<dyn NodeContent>> = Vec::new();
                let outcome = providers
                    .iter()
                    .try_for_each(|provider| provider.provide_children(&*parent_content, &ctx).map(|mut c| produced.append(&mut c)));
                ctx.progress.finish();
                outcome.map(|_| produced)
            }
        };

        let late = {
            let weak = Arc::downgrade(&self.inner);
            move |result: ExpansionResult| {
                let Some(inner) = weak.upgrade() else { return };
                let ui = Arc::clone(&inner.ui);
                let weak = Weak::clone(&weak);
                ui.run_later(Box::new(move || {
                    let Some(inner) = weak.upgrade() else { return };
                    if RootInner::finish_expansion(&inner, id, ticket, result, true).is_some() {
                        let listener = inner.listener.lock().clone();
                        if let Some(listener) = listener {
                            listener.children_changed(id);
                        }
                    }
                }));
            }
        };

        let receiver = match self.inner.scheduler.submit(ticket, work, late) {
            Ok(receiver) => receiver,
            Err(err) => {
                warn!(node = %id, error = %err, "expansion rejected");
                return self.clear_placeholder(id, ticket);
            }
        };

        match receiver.recv_timeout(self.inner.scheduler.latency_budget()) {
            Ok(result) => RootInner::finish_expansion(&self.inner, id, ticket, result, false).unwrap_or_else(no_children),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                debug!(node = %id, ticket, state = ?ExpansionState::TimedOut, "expansion exceeded latency budget; showing placeholder");
                placeholder_array
            }
        }
    }

    /// Undoes a placeholder when an expansion could not be submitted.
    fn clear_placeholder(&self, id: NodeId, ticket: u64) -> Arc<[NodeId]> {
        let mut tree = self.inner.tree.lock();
        if let Some(entry) = tree.arena.get(id) {
            if let ChildrenSlot::Placeholder { ticket: t, node, .. } = entry.children {
                if t == ticket {
                    tree.arena.release(node);
                    if let Some(entry) = tree.arena.get_mut(id) {
                        entry.children = ChildrenSlot::Resolved(no_children());
                    }
                }
            }
        }
        no_children()
    }

    /// Explicitly collapses a subtree, parking fully computed children
    /// in the cache for later re-adoption.
    pub fn collapse(&self, id: NodeId) {
        let mut tree = self.inner.tree.lock();
        self.inner.detach_children(&mut tree, id, true);
    }

    /// Hook for the embedding view, called before a sort-order change
    /// is applied. Complete children arrays stay attached (the view
    /// re-sorts them in place); sampled arrays, recognizable by a
    /// trailing transient marker, are discarded without caching so the
    /// next access recomputes them under the new order.
    pub fn will_be_sorted(&self, id: NodeId) {
        let mut tree = self.inner.tree.lock();
        self.inner.invalidate_sampled(&mut tree, id);
    }

    /// Discards every materialized child while keeping node identity,
    /// used when the filter or sort context changes. `make_empty`
    /// resolves the root to an empty array instead of leaving it
    /// unresolved. The children cache is dropped wholesale: parked
    /// subtrees were produced under the old context.
    pub fn reset(&self, make_empty: bool) {
        let mut tree = self.inner.tree.lock();
        let root = tree.root;
        self.inner.detach_children(&mut tree, root, false);
        for parked in self.inner.cache.clear() {
            RootInner::release_array(&mut tree, &parked);
        }
        if let Some(entry) = tree.arena.get_mut(root) {
            entry.children = if make_empty { ChildrenSlot::Resolved(no_children()) } else { ChildrenSlot::Unresolved };
        }
    }

    /// Full teardown on view close: severs and releases everything
    /// without caching and stops the scheduler. In-flight expansion
    /// results are discarded by the staleness check on arrival.
    pub fn tear_down(&self) {
        self.reset(false);
        self.inner.scheduler.shutdown();
    }

    /// Resolves a derived value for rendering.
    ///
    /// Order: the loop marker's dedicated slots, the content's native
    /// value, the not-available sentinel for lazy types whose heap-wide
    /// pass has not run, the per-node memo, and finally the first
    /// value provider with an opinion, whose outcome (or resolved
    /// absence) is memoized on the node.
    pub fn get_value(&self, id: NodeId, ty: ValueTypeId) -> Value {
        let Some(value_type) = self.inner.values.get(ty) else {
            return Value::Unsupported;
        };

        let content = {
            let tree = self.inner.tree.lock();
            match tree.arena.get(id) {
                Some(entry) => Arc::clone(&entry.content),
                None => return Value::Unsupported,
            }
        };

        if let Some(marker) = content.as_any().downcast_ref::<LoopContent>() {
            if ty == ValueTypeId::LOOP {
                return Value::Node(id);
            }
            if ty == ValueTypeId::LOOP_ORIGIN {
                return Value::Node(marker.origin());
            }
        } else if ty == ValueTypeId::LOOP || ty == ValueTypeId::LOOP_ORIGIN {
            return Value::NoValue;
        }

        let native = content.value(ty, &*self.inner.heap);
        if native != Value::NoValue {
            return native;
        }

        if value_type.is_lazy() && !value_type.values_available(self.inner.heap.id()) {
            return Value::NotAvailable;
        }

        {
            let tree = self.inner.tree.lock();
            if let Some(memoized) = tree.arena.get(id).and_then(|e| e.memo.as_ref()).and_then(|m| m.get(&ty)) {
                return memoized.clone();
            }
        }

        let resolved = self
            .resolved_value_providers()
            .iter()
            .find_map(|provider| provider.value_for(&*content, value_type, &*self.inner.heap))
            .unwrap_or(Value::NotAvailable);

        let mut tree = self.inner.tree.lock();
        if let Some(entry) = tree.arena.get_mut(id) {
            entry.memo.get_or_insert_with(Default::default).insert(ty, resolved.clone());
        }
        resolved
    }

    /// Node providers applicable to this root's heap and view,
    /// resolved on first use and reused afterwards.
    fn resolved_node_providers(&self) -> &[Arc<dyn NodeProvider>] {
        self.inner.node_providers.get_or_init(|| {
            self.inner
                .registry
                .node_providers()
                .iter()
                .filter(|p| p.supports_view(&*self.inner.heap, &self.inner.view_id))
                .cloned()
                .collect()
        })
    }

    fn resolved_value_providers(&self) -> &[Arc<dyn ValueProvider>] {
        self.inner.value_providers.get_or_init(|| {
            self.inner
                .registry
                .value_providers()
                .iter()
                .filter(|p| p.supports_view(&*self.inner.heap, &self.inner.view_id))
                .cloned()
                .collect()
        })
    }
}

impl RootInner {
    /// Attaches an expansion result, running the cycle check, unless
    /// the node's slot no longer expects this ticket. This is the
    /// staleness check shared by the in-budget path and the
    /// late-delivery path; `from_late` distinguishes them.
    /// Returns the attached array; on the in-budget path an
    /// already-resolved slot yields the winning array instead, while
    /// the late path reports it as stale so no change notification
    /// fires for an attachment that already happened.
    fn finish_expansion(inner: &Arc<RootInner>, id: NodeId, ticket: u64, result: ExpansionResult, from_late: bool) -> Option<Arc<[NodeId]>> {
        let mut tree = inner.tree.lock();

        let placeholder = match tree.arena.get(id).map(|e| &e.children) {
            Some(ChildrenSlot::Placeholder { ticket: t, node, .. }) if *t == ticket => *node,
            Some(ChildrenSlot::Resolved(arr)) if !from_late => return Some(Arc::clone(arr)),
            _ => {
                debug!(node = %id, ticket, state = ?ExpansionState::Cancelled, "discarding stale expansion result");
                return None;
            }
        };

        let produced = match result {
            Ok(produced) => produced,
            Err(err) => {
                warn!(node = %id, ticket, error = %err, "expansion degraded to empty children");
                Vec::new()
            }
        };

        // Ancestor chain, parent inclusive, nearest first; children
        // equal (by domain) to any entry become terminal loop markers.
        let mut ancestors: Vec<(NodeId, Arc<dyn NodeContent>)> = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(entry) = tree.arena.get(current) else { break };
            ancestors.push((current, Arc::clone(&entry.content)));
            cursor = entry.parent;
        }

        let mut children = Vec::with_capacity(produced.len());
        for (index, content) in produced.into_iter().enumerate() {
            let content = match ancestors.iter().find(|(_, ancestor)| ancestor.domain_eq(&*content)) {
                Some((origin, _)) => {
                    debug!(node = %id, origin = %origin, "cycle detected; substituting loop marker");
                    Arc::new(LoopContent::new(content, *origin)) as Arc<dyn NodeContent>
                }
                None => content,
            };
            let child = tree.arena.insert(content, Some(id), index);
            children.push(child);
        }

        let array: Arc<[NodeId]> = children.into();
        tree.arena.release(placeholder);
        if let Some(entry) = tree.arena.get_mut(id) {
            entry.children = ChildrenSlot::Resolved(Arc::clone(&array));
        }
        Some(array)
    }

    /// Depth-first detachment. With `use_cache`, fully computed arrays
    /// are parked under the node's structural path and the children
    /// keep their arena slots; without it, parent links are severed and
    /// the slots released. Placeholders are never cached.
    fn detach_children(&self, tree: &mut TreeState, id: NodeId, use_cache: bool) {
        let slot = match tree.arena.get_mut(id) {
            Some(entry) => std::mem::replace(&mut entry.children, ChildrenSlot::Unresolved),
            None => return,
        };
        match slot {
            ChildrenSlot::Unresolved => {}
            ChildrenSlot::Placeholder { node, .. } => {
                tree.arena.release(node);
            }
            ChildrenSlot::Resolved(array) => {
                for child in array.iter() {
                    self.detach_children(tree, *child, use_cache);
                }
                if use_cache {
                    match PathKey::for_node(&tree.arena, id) {
                        Some(key) => {
                            for displaced in self.cache.store(key, Arc::clone(&array)) {
                                Self::release_array(tree, &displaced);
                            }
                        }
                        None => Self::release_array(tree, &array),
                    }
                } else {
                    Self::release_array(tree, &array);
                }
            }
        }
    }

    /// Walks resolved descendants and discards sampled child lists,
    /// recognized by a trailing transient marker, without caching them.
    /// A pending expansion counts as sampled: its placeholder is
    /// discarded here and the staleness check drops the in-flight
    /// result, which was computed under the old order.
    fn invalidate_sampled(&self, tree: &mut TreeState, id: NodeId) {
        let array = match tree.arena.get(id).map(|e| &e.children) {
            Some(ChildrenSlot::Resolved(arr)) => Arc::clone(arr),
            Some(ChildrenSlot::Placeholder { .. }) => {
                debug!(node = %id, "pending expansion discarded ahead of sort change");
                self.detach_children(tree, id, false);
                return;
            }
            _ => return,
        };
        let sampled = array
            .last()
            .and_then(|last| tree.arena.get(*last))
            .is_some_and(|entry| entry.content.is_transient());
        if sampled {
            debug!(node = %id, "sampled children discarded ahead of sort change");
            self.detach_children(tree, id, false);
        } else {
            for child in array.iter() {
                self.invalidate_sampled(tree, *child);
            }
        }
    }

    fn release_array(tree: &mut TreeState, array: &Arc<[NodeId]>) {
        for child in array.iter() {
            tree.arena.release(*child);
        }
    }
}

fn no_children() -> Arc<[NodeId]> {
    Arc::from(Vec::new())
}
