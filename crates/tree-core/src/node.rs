//! Tree nodes and the candidate moves recorded at them.

use std::fmt;

use crate::score::Score;

/// Handle of a node inside a [`NodeStore`](crate::store::NodeStore).
///
/// Ids are dense arena indices assigned in creation order; the root is
/// always [`NodeId::ROOT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub const ROOT: Self = Self(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ranked continuation explored from a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Move label in the engine's notation.
    pub mv: String,
    /// Engine evaluation of the move, from the perspective of the node's side to move.
    pub score: Score,
    /// Node reached by playing the move.
    pub child: NodeId,
}

/// One distinct position.
///
/// Nodes are plain records; the explorer owns every rule that changes them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) position_key: String,
    pub(crate) score: Score,
    pub(crate) best: Option<usize>,
    pub(crate) candidates: Vec<Candidate>,
    pub(crate) progress_distance: u32,
    pub(crate) analysis_sequence: u64,
}

impl Node {
    pub(crate) fn new(id: NodeId, position_key: String, score: Score) -> Self {
        Self {
            id,
            position_key,
            score,
            best: None,
            candidates: Vec::new(),
            progress_distance: 0,
            analysis_sequence: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Canonical position encoding reported by the engine.
    pub fn position_key(&self) -> &str {
        &self.position_key
    }

    /// Current evaluation from the perspective of the side to move.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Candidates in rank order (rank 1 first).
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate_moves(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.mv.as_str())
    }

    pub fn candidate_children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.candidates.iter().map(|c| c.child)
    }

    /// Index into [`candidates`](Self::candidates) of the chosen continuation.
    pub fn best_index(&self) -> Option<usize> {
        self.best
    }

    pub fn best_candidate(&self) -> Option<&Candidate> {
        self.best.and_then(|i| self.candidates.get(i))
    }

    pub fn best_move(&self) -> Option<&str> {
        self.best_candidate().map(|c| c.mv.as_str())
    }

    pub fn best_child(&self) -> Option<NodeId> {
        self.best_candidate().map(|c| c.child)
    }

    /// Plies from this node to the frontier leaf of its best line.
    pub fn progress_distance(&self) -> u32 {
        self.progress_distance
    }

    /// Analysis counter value when the node was last expanded, 0 if never.
    pub fn analysis_sequence(&self) -> u64 {
        self.analysis_sequence
    }

    pub fn is_expanded(&self) -> bool {
        !self.candidates.is_empty()
    }
}
