//! Minimax rules: perspective flips, mate arithmetic, tempo decay, and child
//! preference.
//!
//! Every score here is from the perspective of the side to move at the node
//! that owns it. Converting a child's score to its parent negates it and
//! moves mate distances by one move whenever the mating side changes turn.

use crate::score::Score;

/// Offset that places every mate outside the range of centipawn values.
const MATE_KEY_BASE: i64 = 1_000_000;

/// Converts the engine's evaluation of a move into the initial score of the
/// child position it leads to.
///
/// Unlike [`backup`], no tempo decay applies: the engine already searched
/// the line.
pub fn seed_child(move_score: Score) -> Score {
    match move_score {
        Score::Centipawns(cp) => Score::Centipawns(-cp),
        Score::Mate(n) if n > 0 => Score::Mate(-(n - 1)),
        Score::Mate(n) => Score::Mate(-n),
    }
}

/// A child's score seen from its parent, without tempo decay.
///
/// Centipawns are negated; a mate delivered by the child's side stays the
/// same distance, a mate against the child's side gets one move farther for
/// the parent. Children are ranked on this value.
pub fn parent_view(child: Score) -> Score {
    match child {
        Score::Centipawns(cp) => Score::Centipawns(-cp),
        Score::Mate(m) if m > 0 => Score::Mate(-m),
        Score::Mate(m) => Score::Mate(-m + 1),
    }
}

/// Converts a child's score into its parent's score.
///
/// Same as [`parent_view`], with centipawn values then pulled toward zero by
/// `tempo_decay`.
pub fn backup(child: Score, tempo_decay: i32) -> Score {
    match parent_view(child) {
        Score::Centipawns(cp) if cp > 0 => Score::Centipawns(cp - tempo_decay),
        Score::Centipawns(cp) if cp < 0 => Score::Centipawns(cp + tempo_decay),
        other => other,
    }
}

/// Monotone embedding of a score into integers: a larger key is better for
/// the side to move.
///
/// Winning mates rank above every centipawn value (shorter first), losing
/// mates below (longer first).
pub fn preference_key(score: Score) -> i64 {
    match score {
        Score::Centipawns(cp) => i64::from(cp),
        Score::Mate(n) if n > 0 => MATE_KEY_BASE - i64::from(n),
        Score::Mate(n) => -MATE_KEY_BASE - i64::from(n),
    }
}

/// How the explorer picks the best child of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Highest backed-up score wins; the earlier rank wins ties.
    #[default]
    Strict,
    /// Scores are weighted against the length of each child's unresolved
    /// line, which keeps the frontier from drifting between equally scored
    /// deep lines.
    ///
    /// The weight is `score_weight * key - distance_weight * progress`.
    /// The coefficients are empirical.
    ProgressWeighted {
        score_weight: i64,
        distance_weight: i64,
    },
}

impl SelectionPolicy {
    /// The weighting used by long unattended runs: three points per
    /// centipawn against one search depth per ply of progress distance.
    pub fn progress_weighted(search_depth: u32) -> Self {
        SelectionPolicy::ProgressWeighted {
            score_weight: 3,
            distance_weight: i64::from(search_depth),
        }
    }

    fn weight(self, parent_value: Score, child_progress: u32) -> i64 {
        let key = preference_key(parent_value);
        match self {
            SelectionPolicy::Strict => key,
            SelectionPolicy::ProgressWeighted {
                score_weight,
                distance_weight,
            } => score_weight * key - distance_weight * i64::from(child_progress),
        }
    }

    /// Picks the index of the best option.
    ///
    /// Each option is a child's score converted with [`parent_view`],
    /// together with the child's progress distance. A later
    /// option replaces the current best only when strictly better.
    pub fn choose<I>(self, options: I) -> Option<usize>
    where
        I: IntoIterator<Item = (Score, u32)>,
    {
        let mut best: Option<(usize, i64)> = None;
        for (index, (value, progress)) in options.into_iter().enumerate() {
            let weight = self.weight(value, progress);
            if best.is_none_or(|(_, champion)| weight > champion) {
                best = Some((index, weight));
            }
        }
        best.map(|(index, _)| index)
    }
}
