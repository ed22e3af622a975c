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

//! Lazy presentation model over heap dump data.
//!
//! The model materializes tree nodes on demand: pluggable
//! [`NodeProvider`]s compute children on a worker pool with a bounded
//! synchronous wait, pluggable [`ValueProvider`]s resolve display
//! values, and a per-view [`RootContext`] ties them together with a
//! bounded cache of collapsed subtrees and content-based loop
//! detection.

pub mod cache; // Path-keyed cache of collapsed children arrays
pub mod error;
pub mod node; // Node contents and the slot arena
pub mod provider; // Children computation plug points
pub mod root; // Per-view root context
pub mod scheduler; // Background expansion worker pool
pub mod value; // Display values, value types, lazy heap-wide passes

pub use cache::{CacheConfig, ChildrenCache, PathKey};
pub use error::{ModelError, ModelResult};
pub use node::{ChildrenSlot, LoopContent, MoreNodesContent, NodeArena, NodeContent, NodeEntry, ProgressContent, RootContent, TextContent};
pub use provider::{ExpansionContext, NodeFilter, NodeProvider, ProviderRegistry, SortDirection, SortOrder};
pub use root::{ChildrenState, RootBuilder, RootConfig, RootContext, RootListener};
pub use scheduler::{ExpansionResult, ExpansionScheduler, ExpansionState, SchedulerConfig};
pub use value::{LazyValues, Value, ValueKind, ValueProvider, ValueType, ValueTypeId, ValueTypeRegistry};
