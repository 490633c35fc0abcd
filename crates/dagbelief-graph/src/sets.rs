use std::collections::HashSet;

use fixedbitset::FixedBitSet;

use crate::graph::{GraphIndex, NodeId};

/// Node-id range below which a dense bitset (indexed through
/// `GraphIndex::dense_index`) outperforms a hash set for ancestor/descendant
/// storage: `O(V/64)` words per set versus per-element hashing. Above the
/// threshold we assume sets stay sparse relative to `V` and a hash set wins.
pub const BITSET_NODE_COUNT_THRESHOLD: usize = 50_000;

/// A set of node ids, either a dense bitset or a hash set. Every ancestor
/// and descendant set in a single `Closures` computation uses the same
/// representation, chosen once up front from the graph's size.
#[derive(Clone, Debug)]
pub enum NodeSet {
    Bits(FixedBitSet),
    Hash(HashSet<NodeId>),
}

impl NodeSet {
    pub fn empty(index: &GraphIndex) -> Self {
        if index.node_count() <= BITSET_NODE_COUNT_THRESHOLD {
            NodeSet::Bits(FixedBitSet::with_capacity(index.node_count()))
        } else {
            NodeSet::Hash(HashSet::new())
        }
    }

    pub fn contains(&self, index: &GraphIndex, node: NodeId) -> bool {
        match self {
            NodeSet::Bits(bits) => index
                .dense_index(node)
                .map(|i| bits.contains(i))
                .unwrap_or(false),
            NodeSet::Hash(set) => set.contains(&node),
        }
    }

    pub fn insert(&mut self, index: &GraphIndex, node: NodeId) {
        match self {
            NodeSet::Bits(bits) => {
                if let Some(i) = index.dense_index(node) {
                    bits.insert(i);
                }
            }
            NodeSet::Hash(set) => {
                set.insert(node);
            }
        }
    }

    pub fn union_with(&mut self, index: &GraphIndex, other: &NodeSet) {
        if let (NodeSet::Bits(a), NodeSet::Bits(b)) = (&mut *self, other) {
            a.union_with(b);
            return;
        }
        let elems: Vec<NodeId> = other.iter(index).collect();
        for n in elems {
            self.insert(index, n);
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NodeSet::Bits(bits) => bits.count_ones(..),
            NodeSet::Hash(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter<'a>(&'a self, index: &'a GraphIndex) -> Box<dyn Iterator<Item = NodeId> + 'a> {
        match self {
            NodeSet::Bits(bits) => Box::new(bits.ones().map(move |i| index.node_at(i))),
            NodeSet::Hash(set) => Box::new(set.iter().copied()),
        }
    }

    /// All members in ascending node-id order. Diamond identification
    /// (§4.3's tie-break rule) needs this deterministic ordering; hot paths
    /// that don't care about order should use `iter` instead.
    pub fn sorted_vec(&self, index: &GraphIndex) -> Vec<NodeId> {
        let mut v: Vec<NodeId> = self.iter(index).collect();
        v.sort_unstable();
        v
    }
}
