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
use crate::value::{Value, ValueType};
use heapscope_common::Heap;

/// Resolves a value for a (node, type) pair the node does not know
/// natively.
///
/// Providers are registered on the root context in priority order; the
/// first one returning `Some` wins, and the outcome (including a
/// resolved absence) is memoized on the node so the scan runs at most
/// once per node and type.
pub trait ValueProvider: Send + Sync {
    /// Whether this provider applies to the given heap and view. The
    /// root evaluates this once and caches the filtered list.
    fn supports_view(&self, heap: &dyn Heap, view_id: &str) -> bool {
        let _ = (heap, view_id);
        true
    }

    /// The value of `ty` for `content`, or `None` if this provider has
    /// no opinion and the next one should be consulted.
    fn value_for(&self, content: &dyn NodeContent, ty: &ValueType, heap: &dyn Heap) -> Option<Value>;
}
