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

//! Path-keyed store of detached subtrees.
//!
//! Collapsing a fully computed subtree does not throw the work away:
//! the children array is parked here under a structural path key, and
//! the next expansion of an equal path adopts it back instead of
//! re-running the providers. Without a tracing collector, "reclaimable
//! under memory pressure" is modeled as a hard entry cap with oldest-
//! first eviction plus wholesale invalidation on reset and teardown;
//! an evicted subtree is silently recomputed through the provider path.

use crate::node::arena::NodeArena;
use crate::node::content::NodeContent;
use heapscope_common::NodeId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

/// Content-derived address of a node: its ancestor chain, walked from
/// the node to the root.
///
/// Two keys are equal iff the chains have the same length and each
/// corresponding ancestor is domain-equal, so the key survives node
/// re-materialization, arena slot reuse, and even root replacement
/// after a model refresh. The hash folds in each ancestor while
/// walking; construction is O(depth).
#[derive(Clone)]
pub struct PathKey {
    chain: Vec<Arc<dyn NodeContent>>,
    hash: u64,
}

impl PathKey {
    /// Walks `id`'s parent chain in `arena`. Returns `None` for an id
    /// that is no longer live.
    pub fn for_node(arena: &NodeArena, id: NodeId) -> Option<Self> {
        let mut chain = Vec::new();
        let mut hash: u64 = 0;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let entry = arena.get(current)?;
            hash = hash.wrapping_mul(31).wrapping_add(entry.content.domain_hash());
            chain.push(Arc::clone(&entry.content));
            cursor = entry.parent;
        }
        if chain.is_empty() { None } else { Some(Self { chain, hash }) }
    }

    /// Builds a key directly from a node-to-root content chain.
    pub fn from_chain(chain: Vec<Arc<dyn NodeContent>>) -> Self {
        let mut hash: u64 = 0;
        for content in &chain {
            hash = hash.wrapping_mul(31).wrapping_add(content.domain_hash());
        }
        Self { chain, hash }
    }

    /// Ancestor chain length, node inclusive.
    pub fn depth(&self) -> usize {
        self.chain.len()
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.chain.len() == other.chain.len()
            && self
                .chain
                .iter()
                .zip(other.chain.iter())
                .all(|(a, b)| a.domain_eq(&**b))
    }
}

impl Eq for PathKey {}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl std::fmt::Debug for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathKey")
            .field("depth", &self.depth())
            .field("hash", &self.hash)
            .finish()
    }
}

/// Children cache sizing.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Hard cap on parked subtrees; the oldest entry is evicted when
    /// exceeded.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 1024 }
    }
}

impl CacheConfig {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

struct CacheInner {
    map: HashMap<PathKey, Arc<[NodeId]>>,
    /// Insertion order for oldest-first eviction. May contain keys
    /// already removed from the map; eviction skips those.
    order: VecDeque<PathKey>,
}

/// Store of previously materialized, currently detached children
/// arrays.
///
/// One coarse lock guards both operations: contention is bounded by
/// tree-expansion rate, not data volume, and the background scheduler
/// and the consuming thread must never corrupt the backing map. Every
/// method returns the arrays that fell out of the cache so the caller
/// can release their arena slots; the cache itself never touches the
/// arena.
pub struct ChildrenCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
}

impl ChildrenCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries: config.max_entries.max(1),
        }
    }

    /// Parks `children` under `key`, overwriting any prior entry for
    /// the same path (last write wins). Returns the displaced arrays:
    /// the overwritten entry, if any, plus cap evictions.
    pub fn store(&self, key: PathKey, children: Arc<[NodeId]>) -> Vec<Arc<[NodeId]>> {
        let mut inner = self.inner.lock();
        let mut displaced = Vec::new();

        if let Some(previous) = inner.map.insert(key.clone(), children) {
            displaced.push(previous);
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key);

        while inner.map.len() > self.max_entries {
            let Some(oldest) = inner.order.pop_front() else { break };
            if let Some(evicted) = inner.map.remove(&oldest) {
                debug!(depth = oldest.depth(), "children cache evicted oldest subtree");
                displaced.push(evicted);
            }
        }
        displaced
    }

    /// Removes and returns the entry for `key`. An entry is handed out
    /// at most once; a second expansion of the same path recomputes.
    pub fn retrieve(&self, key: &PathKey) -> Option<Arc<[NodeId]>> {
        self.inner.lock().map.remove(key)
    }

    /// Drops every entry, returning all parked arrays for release.
    pub fn clear(&self) -> Vec<Arc<[NodeId]>> {
        let mut inner = self.inner.lock();
        inner.order.clear();
        inner.map.drain().map(|(_, children)| children).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::content::TextContent;
    use proptest::prelude::*;

    fn chain(names: &[&str]) -> PathKey {
        PathKey::from_chain(names.iter().map(|n| Arc::new(TextContent::new(*n)) as Arc<dyn NodeContent>).collect())
    }

    fn ids(raw: &[u32]) -> Arc<[NodeId]> {
        raw.iter().map(|i| NodeId::new(*i, 0)).collect::<Vec<_>>().into()
    }

    #[test]
    fn retrieve_removes_the_entry() {
        let cache = ChildrenCache::new(CacheConfig::default());
        assert!(cache.store(chain(&["a", "root"]), ids(&[1, 2])).is_empty());

        let hit = cache.retrieve(&chain(&["a", "root"]));
        assert_eq!(hit.as_deref(), Some(&ids(&[1, 2])[..]));
        assert!(cache.retrieve(&chain(&["a", "root"])).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn store_overwrites_and_returns_the_previous_entry() {
        let cache = ChildrenCache::new(CacheConfig::default());
        cache.store(chain(&["a", "root"]), ids(&[1]));
        let displaced = cache.store(chain(&["a", "root"]), ids(&[2]));

        assert_eq!(displaced.len(), 1);
        assert_eq!(&displaced[0][..], &ids(&[1])[..]);
        assert_eq!(cache.retrieve(&chain(&["a", "root"])).as_deref(), Some(&ids(&[2])[..]));
    }

    #[test]
    fn cap_evicts_oldest_first() {
        let cache = ChildrenCache::new(CacheConfig::default().with_max_entries(2));
        cache.store(chain(&["a", "root"]), ids(&[1]));
        cache.store(chain(&["b", "root"]), ids(&[2]));
        let displaced = cache.store(chain(&["c", "root"]), ids(&[3]));

        assert_eq!(displaced.len(), 1);
        assert_eq!(&displaced[0][..], &ids(&[1])[..]);
        assert!(cache.retrieve(&chain(&["a", "root"])).is_none());
        assert!(cache.retrieve(&chain(&["b", "root"])).is_some());
        assert!(cache.retrieve(&chain(&["c", "root"])).is_some());
    }

    #[test]
    fn keys_differ_by_depth_even_with_equal_prefix() {
        let shallow = chain(&["a", "root"]);
        let deep = chain(&["a", "root", "super-root"]);
        assert_ne!(shallow, deep);

        let cache = ChildrenCache::new(CacheConfig::default());
        cache.store(shallow, ids(&[1]));
        assert!(cache.retrieve(&deep).is_none());
    }

    #[test]
    fn clear_returns_everything() {
        let cache = ChildrenCache::new(CacheConfig::default());
        cache.store(chain(&["a", "root"]), ids(&[1]));
        cache.store(chain(&["b", "root"]), ids(&[2]));

        let drained = cache.clear();
        assert_eq!(drained.len(), 2);
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn equal_chains_produce_equal_keys_and_hashes(names in prop::collection::vec("[a-z]{1,8}", 1..8)) {
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let a = chain(&refs);
            let b = chain(&refs);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.hash, b.hash);
        }

        #[test]
        fn reversed_chains_differ_unless_palindromic(names in prop::collection::vec("[a-z]{1,8}", 2..8)) {
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut reversed = refs.clone();
            reversed.reverse();
            let forward = chain(&refs);
            let backward = chain(&reversed);
            prop_assert_eq!(forward == backward, refs == reversed);
        }
    }
}
