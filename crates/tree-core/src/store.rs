//! Identity-deduplicated node arena.

use std::collections::HashMap;
use std::ops::Index;

use rapidhash::fast::RandomState;

use crate::node::{Node, NodeId};
use crate::score::Score;

type KeyIndex = HashMap<String, NodeId, RandomState>;

/// Append-only storage of every position discovered so far.
///
/// Transpositions collapse onto one node, so the stored structure is a
/// rooted DAG rather than a tree. Nodes are never removed.
#[derive(Debug)]
pub struct NodeStore {
    nodes: Vec<Node>,
    index: KeyIndex,
    analysis_count: u64,
}

impl NodeStore {
    /// Creates a store holding only the root position.
    pub fn with_root(position_key: impl Into<String>, seed: Score) -> Self {
        let mut store = Self {
            nodes: Vec::new(),
            index: KeyIndex::default(),
            analysis_count: 0,
        };
        store.get_or_create(&position_key.into(), seed);
        store
    }

    /// Rebuilds a store from fully populated nodes ordered by id.
    ///
    /// Callers guarantee dense ids starting at the root and unique keys.
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut index = KeyIndex::default();
        index.reserve(nodes.len());
        for node in &nodes {
            index.insert(node.position_key.clone(), node.id);
        }
        let analysis_count = nodes
            .iter()
            .map(|n| n.analysis_sequence)
            .max()
            .unwrap_or(0);
        Self {
            nodes,
            index,
            analysis_count,
        }
    }

    /// Returns the node for `position_key`, creating it with `seed` if unseen.
    ///
    /// The flag is `true` when a new node was appended.
    pub fn get_or_create(&mut self, position_key: &str, seed: Score) -> (NodeId, bool) {
        if let Some(&id) = self.index.get(position_key) {
            return (id, false);
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, position_key.to_string(), seed));
        self.index.insert(position_key.to_string(), id);
        (id, true)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn id_of(&self, position_key: &str) -> Option<NodeId> {
        self.index.get(position_key).copied()
    }

    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of expansions performed over the lifetime of the tree.
    pub fn analysis_count(&self) -> u64 {
        self.analysis_count
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Advances the analysis counter and returns the new value.
    pub(crate) fn next_analysis(&mut self) -> u64 {
        self.analysis_count += 1;
        self.analysis_count
    }
}

impl Index<NodeId> for NodeStore {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl PartialEq for NodeStore {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.analysis_count == other.analysis_count
    }
}

impl Eq for NodeStore {}
