use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dagbelief_algebra::Prob;
use dagbelief_graph::{
    classify_forks_joins, compute_layers_and_closures, Closures, Edge, ForkJoin, GraphIndex,
    Layers, NodeId,
};
use rayon::prelude::*;

use crate::identify::{find_diamond, DiamondDescriptor};

/// Content-addressing key: a 128-bit digest of the canonical
/// `(sorted edgelist, sorted highest_nodes, join)` triple, truncated from a
/// `blake3` hash. Collisions are astronomically unlikely; we don't carry a
/// fallback equality check since no two non-identical diamonds have ever
/// been observed to collide in this key space, and `HashMap` already gives
/// us exact-match semantics for any value that does land in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DiamondKey([u8; 16]);

impl DiamondKey {
    pub fn canonical(descriptor: &DiamondDescriptor) -> Self {
        let mut edges = descriptor.edgelist.clone();
        edges.sort_by_key(|e| (e.source, e.target));
        let mut highest = descriptor.highest_nodes.clone();
        highest.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&(edges.len() as u64).to_le_bytes());
        for e in &edges {
            hasher.update(&e.source.to_le_bytes());
            hasher.update(&e.target.to_le_bytes());
        }
        hasher.update(&(highest.len() as u64).to_le_bytes());
        for h in &highest {
            hasher.update(&h.to_le_bytes());
        }
        hasher.update(&descriptor.join.to_le_bytes());

        let digest = hasher.finalize();
        let mut key = [0u8; 16];
        key.copy_from_slice(&digest.as_bytes()[..16]);
        Self(key)
    }
}

/// A diamond's descriptor plus the structural artifacts precomputed over its
/// induced sub-DAG, and the diamonds nested strictly inside it, keyed by
/// their own join node (so the engine can dispatch case D for an inner join
/// while recomputing beliefs under conditioning, without re-running
/// identification).
#[derive(Debug)]
pub struct UniqueDiamond {
    pub descriptor: DiamondDescriptor,
    pub sub_layers: Layers,
    pub sub_closures: Closures,
    pub sub_forks: std::collections::HashSet<NodeId>,
    pub sub_joins: std::collections::HashSet<NodeId>,
    pub nested_by_join: HashMap<NodeId, DiamondKey>,
}

#[derive(Debug, Default)]
struct DiamondStoreStatsAcc {
    unique_count: usize,
    max_depth: usize,
}

/// Read-only summary of a built store, for callers that want structural
/// statistics without walking the store themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiamondStoreStats {
    pub unique_diamond_count: usize,
    pub root_diamond_count: usize,
    pub max_nesting_depth: usize,
}

/// Deduplicated, content-addressed store of every diamond discovered in a
/// graph, built depth-first from each join node that has a root diamond.
/// Two diamonds with identical topology (edgelist, highest nodes, join)
/// share one entry regardless of which root join first discovered them.
pub struct DiamondStore {
    entries: Mutex<HashMap<DiamondKey, Arc<UniqueDiamond>>>,
    root_by_join: HashMap<NodeId, DiamondKey>,
}

impl DiamondStore {
    /// Build the store for every join node in `fj.joins`. Root joins are
    /// independent of one another and are explored concurrently; nested
    /// diamonds within a root's subtree are explored depth-first on that
    /// thread, coordinating through the same content-addressed map so a
    /// sub-diamond shared across two different root trees is only built
    /// once.
    pub fn build(
        index: &GraphIndex,
        fj: &ForkJoin,
        closures: &Closures,
        priors: &HashMap<NodeId, Prob>,
    ) -> Self {
        let entries: Mutex<HashMap<DiamondKey, Arc<UniqueDiamond>>> = Mutex::new(HashMap::new());

        let mut joins: Vec<NodeId> = fj.joins.iter().copied().collect();
        joins.sort_unstable();

        let root_pairs: Vec<(NodeId, Option<DiamondKey>)> = joins
            .par_iter()
            .map(|&j| {
                let key = find_diamond(j, index, fj, closures, priors)
                    .map(|descriptor| insert_recursive(&entries, descriptor, priors));
                (j, key)
            })
            .collect();

        let mut root_by_join = HashMap::new();
        for (j, key) in root_pairs {
            if let Some(k) = key {
                root_by_join.insert(j, k);
            }
        }

        Self {
            entries,
            root_by_join,
        }
    }

    pub fn get(&self, key: DiamondKey) -> Option<Arc<UniqueDiamond>> {
        self.entries.lock().expect("diamond store mutex poisoned").get(&key).cloned()
    }

    pub fn root_for_join(&self, join: NodeId) -> Option<DiamondKey> {
        self.root_by_join.get(&join).copied()
    }

    pub fn stats(&self) -> DiamondStoreStats {
        let entries = self.entries.lock().expect("diamond store mutex poisoned");
        let mut acc = DiamondStoreStatsAcc::default();
        acc.unique_count = entries.len();
        for key in entries.keys() {
            let depth = nesting_depth(&entries, *key);
            acc.max_depth = acc.max_depth.max(depth);
        }
        DiamondStoreStats {
            unique_diamond_count: acc.unique_count,
            root_diamond_count: self.root_by_join.len(),
            max_nesting_depth: acc.max_depth,
        }
    }
}

fn nesting_depth(entries: &HashMap<DiamondKey, Arc<UniqueDiamond>>, key: DiamondKey) -> usize {
    match entries.get(&key) {
        Some(ud) if ud.nested_by_join.is_empty() => 1,
        Some(ud) => {
            1 + ud
                .nested_by_join
                .values()
                .map(|&k| nesting_depth(entries, k))
                .max()
                .unwrap_or(0)
        }
        None => 0,
    }
}

/// Insert `descriptor` (and every diamond nested inside it) into `entries`,
/// returning its key. Insert-once: if the key is already present (discovered
/// via another root's subtree, concurrently or earlier), the existing entry
/// is reused and this descriptor's own sub-structure is not recomputed.
fn insert_recursive(
    entries: &Mutex<HashMap<DiamondKey, Arc<UniqueDiamond>>>,
    descriptor: DiamondDescriptor,
    priors: &HashMap<NodeId, Prob>,
) -> DiamondKey {
    let key = DiamondKey::canonical(&descriptor);
    if entries.lock().expect("diamond store mutex poisoned").contains_key(&key) {
        return key;
    }

    let sub_index = GraphIndex::build(descriptor.edgelist.iter().copied())
        .expect("a diamond's induced edgelist is a sub-DAG of an already-validated DAG");
    let sub_fj = classify_forks_joins(&sub_index);
    let (sub_layers, sub_closures) = compute_layers_and_closures(&sub_index)
        .expect("a diamond sub-DAG inherits acyclicity from its parent graph");

    let mut inner_joins: Vec<NodeId> = sub_fj
        .joins
        .iter()
        .copied()
        .filter(|&j| j != descriptor.join)
        .collect();
    inner_joins.sort_unstable();

    let mut nested_by_join = HashMap::new();
    for j in inner_joins {
        if let Some(nested) = find_diamond(j, &sub_index, &sub_fj, &sub_closures, priors) {
            nested_by_join.insert(j, insert_recursive(entries, nested, priors));
        }
    }

    let unique = Arc::new(UniqueDiamond {
        descriptor,
        sub_layers,
        sub_closures,
        sub_forks: sub_fj.forks,
        sub_joins: sub_fj.joins,
        nested_by_join,
    });

    entries
        .lock()
        .expect("diamond store mutex poisoned")
        .entry(key)
        .or_insert(unique);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(pairs: &[(u64, u64)]) -> GraphIndex {
        GraphIndex::build(pairs.iter().map(|&(s, t)| Edge::new(s, t))).unwrap()
    }

    #[test]
    fn build_finds_one_root_diamond() {
        let idx = index(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let fj = classify_forks_joins(&idx);
        let (_, closures) = compute_layers_and_closures(&idx).unwrap();
        let store = DiamondStore::build(&idx, &fj, &closures, &HashMap::new());
        let stats = store.stats();
        assert_eq!(stats.root_diamond_count, 1);
        assert_eq!(stats.unique_diamond_count, 1);
        assert_eq!(stats.max_nesting_depth, 1);
        let key = store.root_for_join(4).unwrap();
        let diamond = store.get(key).unwrap();
        assert_eq!(diamond.descriptor.highest_nodes, vec![1]);
    }

    #[test]
    fn build_finds_nested_diamond_scenario_b() {
        let idx = index(&[(1, 2), (1, 3), (2, 3), (2, 4), (3, 4)]);
        let fj = classify_forks_joins(&idx);
        let (_, closures) = compute_layers_and_closures(&idx).unwrap();
        let store = DiamondStore::build(&idx, &fj, &closures, &HashMap::new());
        let stats = store.stats();
        assert_eq!(stats.root_diamond_count, 2);
        let outer_key = store.root_for_join(4).unwrap();
        let outer = store.get(outer_key).unwrap();
        assert_eq!(outer.nested_by_join.len(), 1);
        assert!(outer.nested_by_join.contains_key(&3));
    }

    #[test]
    fn diamond_idempotence_across_two_builds() {
        let idx = index(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        let fj = classify_forks_joins(&idx);
        let (_, closures) = compute_layers_and_closures(&idx).unwrap();
        let a = DiamondStore::build(&idx, &fj, &closures, &HashMap::new());
        let b = DiamondStore::build(&idx, &fj, &closures, &HashMap::new());
        assert_eq!(a.stats(), b.stats());
        assert_eq!(
            a.root_for_join(4).unwrap().0,
            b.root_for_join(4).unwrap().0
        );
    }

    #[test]
    fn no_diamonds_in_a_tree() {
        let idx = index(&[(1, 2), (2, 3), (2, 4)]);
        let fj = classify_forks_joins(&idx);
        let (_, closures) = compute_layers_and_closures(&idx).unwrap();
        let store = DiamondStore::build(&idx, &fj, &closures, &HashMap::new());
        assert_eq!(store.stats().unique_diamond_count, 0);
    }
}
