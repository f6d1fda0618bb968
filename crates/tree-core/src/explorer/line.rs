//! Read-only traversals of the stored DAG.

use std::collections::HashSet;

use crate::error::{ExploreError, Result};
use crate::node::{Candidate, Node, NodeId};
use crate::store::NodeStore;

/// The best line from the root to the frontier leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Visited nodes, root first; never empty.
    pub nodes: Vec<NodeId>,
    /// Moves between consecutive nodes.
    pub moves: Vec<String>,
}

impl Line {
    pub fn leaf(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Number of moves from the root to the leaf.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Follows best moves from the root until a node without one.
///
/// Transpositions can close a loop through best moves; revisiting a node is
/// reported as [`ExploreError::CyclicLine`].
pub fn principal_line(store: &NodeStore) -> Result<Line> {
    let mut node = store.root();
    let mut line = Line {
        nodes: vec![node.id()],
        moves: Vec::new(),
    };
    let mut visited = HashSet::from([node.id()]);

    while let Some(best) = node.best_candidate() {
        if !visited.insert(best.child) {
            return Err(ExploreError::CyclicLine {
                position_key: store[best.child].position_key().to_string(),
            });
        }
        line.moves.push(best.mv.clone());
        line.nodes.push(best.child);
        node = &store[best.child];
    }

    Ok(line)
}

/// One edge reported by [`walk`].
pub struct WalkEntry<'a> {
    /// Plies below the root.
    pub depth: usize,
    pub candidate: &'a Candidate,
    pub child: &'a Node,
    /// `true` if the candidate is the parent's chosen continuation.
    pub is_best: bool,
    /// `true` if the child was already reported through another path; its
    /// subtree is not repeated.
    pub is_transposition: bool,
}

/// Depth-first walk over candidates in rank order, down to `max_depth` plies.
///
/// Each node's subtree is visited once; later paths into it are reported
/// with `is_transposition` set and not descended.
pub fn walk<F>(store: &NodeStore, max_depth: usize, mut visit: F)
where
    F: FnMut(&WalkEntry<'_>),
{
    let mut visited = HashSet::from([NodeId::ROOT]);
    let mut stack: Vec<(NodeId, usize, usize)> = vec![(NodeId::ROOT, 0, 0)];

    while let Some((id, next_candidate, depth)) = stack.pop() {
        let node = &store[id];
        let Some(candidate) = node.candidates().get(next_candidate) else {
            continue;
        };
        stack.push((id, next_candidate + 1, depth));

        let child = &store[candidate.child];
        let is_transposition = !visited.insert(child.id());
        visit(&WalkEntry {
            depth: depth + 1,
            candidate,
            child,
            is_best: node.best_index() == Some(next_candidate),
            is_transposition,
        });

        if !is_transposition && depth + 1 < max_depth {
            stack.push((child.id(), 0, depth + 1));
        }
    }
}
