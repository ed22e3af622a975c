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

//! Pluggable child-production strategies.
//!
//! A view's children are not hardwired; any number of
//! [`NodeProvider`]s contribute, in registration order, the children of
//! a node they recognize. The embedding application assembles a
//! [`ProviderRegistry`] per view family and injects it at root
//! creation: an explicit replacement for classpath-wide service
//! discovery, with the same resolve-once semantics on the root.

use crate::error::ModelResult;
use crate::node::content::NodeContent;
use crate::value::{ValueProvider, ValueTypeId};
use heapscope_common::{Heap, Progress};
use std::sync::Arc;

/// Sort direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One element of a view's active sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub value_type: ValueTypeId,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn ascending(value_type: ValueTypeId) -> Self {
        Self {
            value_type,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(value_type: ValueTypeId) -> Self {
        Self {
            value_type,
            direction: SortDirection::Descending,
        }
    }
}

/// Filter over node contents, applied by providers while producing
/// children.
pub trait NodeFilter: Send + Sync {
    fn accepts(&self, content: &dyn NodeContent, heap: &dyn Heap) -> bool;
}

/// Everything a provider may consult while producing children.
///
/// Owned and cloneable so an expansion can carry it onto a worker
/// thread; the heap handle is read-only and safely shared.
#[derive(Clone)]
pub struct ExpansionContext {
    pub heap: Arc<dyn Heap>,
    pub view_id: String,
    pub filter: Option<Arc<dyn NodeFilter>>,
    pub sort: Vec<SortOrder>,
    pub progress: Arc<dyn Progress>,
}

impl ExpansionContext {
    /// Convenience for providers applying the active filter.
    pub fn accepts(&self, content: &dyn NodeContent) -> bool {
        match &self.filter {
            Some(filter) => filter.accepts(content, &*self.heap),
            None => true,
        }
    }
}

/// Produces the children of nodes it recognizes.
///
/// Multiple providers may apply to one node; the engine concatenates
/// their results in registration order. Long child lists should be
/// truncated with a [`MoreNodesContent`](crate::node::MoreNodesContent)
/// marker rather than returned whole.
pub trait NodeProvider: Send + Sync {
    /// Short name for log correlation.
    fn name(&self) -> &str;

    /// Whether this provider applies to the given heap and view. The
    /// root evaluates this once and caches the filtered list.
    fn supports_view(&self, heap: &dyn Heap, view_id: &str) -> bool;

    /// Whether this provider can produce children for `parent`.
    fn supports_node(&self, parent: &dyn NodeContent) -> bool {
        let _ = parent;
        true
    }

    /// Produces `parent`'s children. Runs on a worker thread; a
    /// returned error (or panic) degrades the whole expansion to an
    /// empty child list at the scheduler boundary.
    fn provide_children(&self, parent: &dyn NodeContent, ctx: &ExpansionContext) -> ModelResult<Vec<Arc<dyn NodeContent>>>;
}

/// Ordered provider sets for one view family, assembled by the
/// embedding application and injected into each root context.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    node_providers: Vec<Arc<dyn NodeProvider>>,
    value_providers: Vec<Arc<dyn ValueProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_provider(mut self, provider: Arc<dyn NodeProvider>) -> Self {
        self.node_providers.push(provider);
        self
    }

    pub fn with_value_provider(mut self, provider: Arc<dyn ValueProvider>) -> Self {
        self.value_providers.push(provider);
        self
    }

    pub fn node_providers(&self) -> &[Arc<dyn NodeProvider>] {
        &self.node_providers
    }

    pub fn value_providers(&self) -> &[Arc<dyn ValueProvider>] {
        &self.value_providers
    }
}
