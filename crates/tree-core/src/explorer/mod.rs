//! Tree growth: selection, expansion, and backpropagation.
//!
//! Each iteration follows best moves from the root to the frontier leaf,
//! asks the oracle to rank the leaf's continuations, attaches them as
//! children, and re-derives best moves and scores from the leaf back up to
//! the root.

mod line;
mod run;
pub mod scoring;

use log::debug;

pub use line::{Line, WalkEntry, principal_line, walk};
pub use run::{RunObserver, RunOptions, RunSummary, SavePolicy, StopReason};
pub use scoring::SelectionPolicy;

use crate::error::{ExploreError, Result};
use crate::node::{Candidate, NodeId};
use crate::oracle::{Oracle, PositionSetup, RankedMove};
use crate::score::Score;
use crate::store::NodeStore;

/// Search parameters fixed for the lifetime of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// Depth of every oracle search.
    pub search_depth: u32,
    /// Maximum number of candidates recorded per expansion.
    pub candidate_limit: usize,
    /// Centipawns a score loses each time it is backed up one ply.
    pub tempo_decay: i32,
    pub policy: SelectionPolicy,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            search_depth: 16,
            candidate_limit: 6,
            tempo_decay: 5,
            policy: SelectionPolicy::Strict,
        }
    }
}

/// Outcome of one successful growth iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationReport {
    /// Analysis number assigned to the expanded leaf.
    pub analysis: u64,
    /// Moves from the root to the expanded leaf.
    pub line: Vec<String>,
    /// Score of the leaf before it was expanded.
    pub leaf_score: Score,
    /// Candidates returned by the oracle, best first.
    pub alternatives: Vec<RankedMove>,
    /// Root score after backpropagation.
    pub root_score: Score,
    /// Total nodes in the store.
    pub nodes: usize,
}

/// Drives tree growth for one store with one oracle.
pub struct Explorer<'c, O> {
    oracle: O,
    store: NodeStore,
    config: &'c ExplorerConfig,
}

impl<'c, O: Oracle> Explorer<'c, O> {
    /// Resumes exploration of an existing tree.
    pub fn new(oracle: O, store: NodeStore, config: &'c ExplorerConfig) -> Self {
        Self {
            oracle,
            store,
            config,
        }
    }

    /// Starts a tree holding only `root`, identified through the oracle.
    pub fn with_fresh_tree(
        mut oracle: O,
        root: &PositionSetup<'_>,
        config: &'c ExplorerConfig,
    ) -> Result<Self> {
        let key = oracle.position_key(root)?;
        debug!("New tree rooted at {key}");
        let store = NodeStore::with_root(key, Score::ZERO);
        Ok(Self::new(oracle, store, config))
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn config(&self) -> &ExplorerConfig {
        self.config
    }

    pub fn into_parts(self) -> (O, NodeStore) {
        (self.oracle, self.store)
    }

    /// Returns the current best line from the root to the frontier leaf.
    pub fn select(&self) -> Result<Line> {
        principal_line(&self.store)
    }

    /// Runs one selection, expansion, and backpropagation pass.
    ///
    /// # Errors
    ///
    /// [`ExploreError::ExhaustedExpansion`] if the oracle reports no usable
    /// candidate; the leaf is left unexpanded. Oracle failures and cyclic best
    /// lines are returned as they occur.
    pub fn step(&mut self) -> Result<IterationReport> {
        let line = self.select()?;
        let leaf = line.leaf();
        let leaf_score = self.store[leaf].score();

        let ranked = self.expand(leaf)?;
        self.backpropagate(&line.nodes);

        Ok(IterationReport {
            analysis: self.store[leaf].analysis_sequence(),
            line: line.moves,
            leaf_score,
            alternatives: ranked,
            root_score: self.store.root().score(),
            nodes: self.store.len(),
        })
    }

    /// Ends the oracle session.
    pub fn shutdown(&mut self) -> Result<()> {
        self.oracle.shutdown()?;
        Ok(())
    }

    /// Queries the oracle for `leaf` and attaches the ranked children.
    ///
    /// Every child position is identified before the store changes, so a
    /// failed query leaves both the leaf and the store untouched.
    fn expand(&mut self, leaf: NodeId) -> Result<Vec<RankedMove>> {
        let leaf_key = self.store[leaf].position_key().to_string();
        let ranked = self.oracle.ranked_candidates(
            &leaf_key,
            self.config.search_depth,
            self.config.candidate_limit,
        )?;
        if ranked.is_empty() {
            return Err(ExploreError::ExhaustedExpansion {
                position_key: leaf_key,
            });
        }

        let mut child_keys = Vec::with_capacity(ranked.len());
        for ranked_move in &ranked {
            let setup = PositionSetup::Fen {
                fen: &leaf_key,
                moves: &[ranked_move.mv.as_str()],
            };
            child_keys.push(self.oracle.position_key(&setup)?);
        }

        let mut candidates = Vec::with_capacity(ranked.len());
        for (ranked_move, child_key) in ranked.iter().zip(&child_keys) {
            let seed = scoring::seed_child(ranked_move.score);
            let (child, created) = self.store.get_or_create(child_key, seed);
            if !created {
                debug!("Transposition into node {child} via {}", ranked_move.mv);
            }
            candidates.push(Candidate {
                mv: ranked_move.mv.clone(),
                score: ranked_move.score,
                child,
            });
        }

        let analysis = self.store.next_analysis();
        let node = self.store.node_mut(leaf);
        node.analysis_sequence = analysis;
        node.candidates = candidates;
        node.best = Some(0);
        node.score = ranked[0].score;

        Ok(ranked)
    }

    /// Recomputes best child, score, and progress distance for every node
    /// on `path`, leaf first.
    fn backpropagate(&mut self, path: &[NodeId]) {
        for &id in path.iter().rev() {
            self.minimax(id);
        }
    }

    fn minimax(&mut self, id: NodeId) {
        let node = &self.store[id];
        let options = node.candidates().iter().map(|c| {
            let child = &self.store[c.child];
            (scoring::parent_view(child.score()), child.progress_distance())
        });
        let Some(best) = self.config.policy.choose(options) else {
            return;
        };

        let child = &self.store[node.candidates()[best].child];
        let score = scoring::backup(child.score(), self.config.tempo_decay);
        let progress_distance = child.progress_distance() + 1;

        let node = self.store.node_mut(id);
        node.best = Some(best);
        node.score = score;
        node.progress_distance = progress_distance;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::OracleError;

    const ROOT: &str = "root";

    /// Oracle answering from fixed tables; child keys are `parent/move`
    /// unless a transposition is registered.
    #[derive(Default)]
    struct TableOracle {
        searches: HashMap<String, Vec<RankedMove>>,
        transpositions: HashMap<String, String>,
        /// Paths the oracle cannot identify.
        unknown: Vec<String>,
        shutdowns: usize,
    }

    impl TableOracle {
        fn search(mut self, key: &str, ranked: &[(&str, Score)]) -> Self {
            let ranked = ranked
                .iter()
                .map(|(mv, score)| RankedMove::new(*mv, *score))
                .collect();
            self.searches.insert(key.to_string(), ranked);
            self
        }
    }

    impl Oracle for TableOracle {
        fn position_key(&mut self, setup: &PositionSetup<'_>) -> Result<String, OracleError> {
            Ok(match setup {
                PositionSetup::StartPos => ROOT.to_string(),
                PositionSetup::Fen { fen, moves } => {
                    let key = std::iter::once(*fen)
                        .chain(moves.iter().copied())
                        .collect::<Vec<_>>()
                        .join("/");
                    if self.unknown.contains(&key) {
                        return Err(OracleError::Protocol(format!("no position for {key}")));
                    }
                    self.transpositions.get(&key).cloned().unwrap_or(key)
                }
            })
        }

        fn ranked_candidates(
            &mut self,
            position_key: &str,
            _depth: u32,
            limit: usize,
        ) -> Result<Vec<RankedMove>, OracleError> {
            let mut ranked = self.searches.get(position_key).cloned().unwrap_or_default();
            ranked.truncate(limit);
            Ok(ranked)
        }

        fn shutdown(&mut self) -> Result<(), OracleError> {
            self.shutdowns += 1;
            Ok(())
        }
    }

    fn explorer(oracle: TableOracle, config: &ExplorerConfig) -> Explorer<'_, TableOracle> {
        Explorer::with_fresh_tree(oracle, &PositionSetup::StartPos, config).unwrap()
    }

    #[test]
    fn test_first_iteration_seeds_children_and_backs_up() {
        let config = ExplorerConfig::default();
        let oracle = TableOracle::default().search(
            ROOT,
            &[("m1", Score::Centipawns(-20)), ("m2", Score::Centipawns(-40))],
        );
        let mut explorer = explorer(oracle, &config);

        let report = explorer.step().unwrap();
        assert_eq!(report.analysis, 1);
        assert!(report.line.is_empty());
        assert_eq!(report.leaf_score, Score::ZERO);

        let store = explorer.store();
        assert_eq!(store.len(), 3);
        let m1 = store.id_of("root/m1").unwrap();
        let m2 = store.id_of("root/m2").unwrap();
        assert_eq!(store[m1].score(), Score::Centipawns(20));
        assert_eq!(store[m2].score(), Score::Centipawns(40));

        let root = store.root();
        assert_eq!(root.candidate_moves().collect::<Vec<_>>(), ["m1", "m2"]);
        assert_eq!(root.candidate_children().collect::<Vec<_>>(), [m1, m2]);
        assert_eq!(root.best_move(), Some("m1"));
        assert_eq!(root.best_child(), Some(m1));
        assert_eq!(root.score(), Score::Centipawns(-20 + config.tempo_decay));
        assert_eq!(root.progress_distance(), 1);
        assert_eq!(root.analysis_sequence(), 1);
        assert_eq!(report.root_score, root.score());
    }

    #[test]
    fn test_near_zero_scores_rank_before_decay() {
        let config = ExplorerConfig::default();
        let oracle = TableOracle::default().search(
            ROOT,
            &[("b", Score::Centipawns(1)), ("a", Score::Centipawns(-3))],
        );
        let mut explorer = explorer(oracle, &config);
        explorer.step().unwrap();

        let root = explorer.store().root();
        assert_eq!(root.best_move(), Some("b"));
        // Child b is worth -1 to itself; backed up with decay: 1 - 5.
        assert_eq!(root.score(), Score::Centipawns(-4));
    }

    #[test]
    fn test_near_zero_ranking_with_progress_policy() {
        let config = ExplorerConfig {
            policy: SelectionPolicy::progress_weighted(16),
            ..Default::default()
        };
        let oracle = TableOracle::default().search(
            ROOT,
            &[("a", Score::Centipawns(-3)), ("b", Score::Centipawns(1))],
        );
        let mut explorer = explorer(oracle, &config);
        explorer.step().unwrap();
        assert_eq!(explorer.store().root().best_move(), Some("b"));
    }

    #[test]
    fn test_failed_identity_query_leaves_store_untouched() {
        let config = ExplorerConfig::default();
        let mut oracle = TableOracle::default().search(
            ROOT,
            &[("a", Score::Centipawns(10)), ("b", Score::Centipawns(5))],
        );
        oracle.unknown.push("root/b".to_string());
        let mut explorer = explorer(oracle, &config);

        let err = explorer.step().unwrap_err();
        assert!(matches!(err, ExploreError::Oracle(OracleError::Protocol(_))));

        let store = explorer.store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.id_of("root/a"), None);
        assert!(!store.root().is_expanded());
        assert_eq!(store.analysis_count(), 0);
    }

    #[test]
    fn test_mate_beats_large_advantage() {
        let config = ExplorerConfig::default();
        let oracle = TableOracle::default().search(
            ROOT,
            &[("quiet", Score::Centipawns(500)), ("mate", Score::Mate(1))],
        );
        let mut explorer = explorer(oracle, &config);
        explorer.step().unwrap();

        let root = explorer.store().root();
        assert_eq!(root.best_move(), Some("mate"));
        assert_eq!(root.score(), Score::Mate(1));
    }

    #[test]
    fn test_mate_candidate_selected_regardless_of_rank() {
        let config = ExplorerConfig::default();
        let oracle = TableOracle::default().search(
            ROOT,
            &[
                ("a", Score::Centipawns(50)),
                ("b", Score::Centipawns(30)),
                ("c", Score::Mate(3)),
            ],
        );
        let mut explorer = explorer(oracle, &config);
        explorer.step().unwrap();

        let root = explorer.store().root();
        assert_eq!(root.best_move(), Some("c"));
        assert_eq!(root.best_index(), Some(2));
        assert_eq!(root.score(), Score::Mate(3));
    }

    #[test]
    fn test_second_iteration_descends_and_backs_up_two_plies() {
        let config = ExplorerConfig::default();
        let oracle = TableOracle::default()
            .search(ROOT, &[("e4", Score::Centipawns(30)), ("d4", Score::Centipawns(25))])
            .search("root/e4", &[("e5", Score::Centipawns(-10)), ("c5", Score::Centipawns(-60))]);
        let mut explorer = explorer(oracle, &config);
        explorer.step().unwrap();
        let report = explorer.step().unwrap();

        assert_eq!(report.analysis, 2);
        assert_eq!(report.line, ["e4"]);
        assert_eq!(report.leaf_score, Score::Centipawns(-30));

        let store = explorer.store();
        let e4 = store.id_of("root/e4").unwrap();
        // e4 node: children seeded +10 and +60, best is e5 with 10 backed up to -5.
        assert_eq!(store[e4].best_move(), Some("e5"));
        assert_eq!(store[e4].score(), Score::Centipawns(-5));
        assert_eq!(store[e4].progress_distance(), 1);
        // Root: e4 is worth 5 and d4 (seeded -25) 25 to the root; d4 now wins.
        let root = store.root();
        assert_eq!(root.best_move(), Some("d4"));
        assert_eq!(root.score(), Score::Centipawns(20));
        assert_eq!(root.progress_distance(), 1);
    }

    #[test]
    fn test_exhausted_expansion_leaves_leaf_untouched() {
        let config = ExplorerConfig::default();
        let mut explorer = explorer(TableOracle::default(), &config);

        let err = explorer.step().unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ExploreError::ExhaustedExpansion { .. }));

        let root = explorer.store().root();
        assert!(!root.is_expanded());
        assert_eq!(root.analysis_sequence(), 0);
        assert_eq!(explorer.store().analysis_count(), 0);
    }

    #[test]
    fn test_candidate_limit_is_respected() {
        let config = ExplorerConfig {
            candidate_limit: 1,
            ..Default::default()
        };
        let oracle = TableOracle::default().search(
            ROOT,
            &[("a", Score::Centipawns(5)), ("b", Score::Centipawns(1))],
        );
        let mut explorer = explorer(oracle, &config);
        explorer.step().unwrap();
        assert_eq!(explorer.store().root().candidates().len(), 1);
    }

    #[test]
    fn test_cyclic_best_line_is_reported() {
        let config = ExplorerConfig::default();
        let mut oracle = TableOracle::default()
            .search(ROOT, &[("out", Score::Centipawns(0))])
            .search("root/out", &[("back", Score::Centipawns(0))]);
        oracle
            .transpositions
            .insert("root/out/back".to_string(), ROOT.to_string());
        let mut explorer = explorer(oracle, &config);
        explorer.step().unwrap();
        explorer.step().unwrap();

        assert!(matches!(
            explorer.step(),
            Err(ExploreError::CyclicLine { .. })
        ));
    }

    #[test]
    fn test_shutdown_reaches_oracle() {
        let config = ExplorerConfig::default();
        let mut explorer = explorer(TableOracle::default(), &config);
        explorer.shutdown().unwrap();
        let (oracle, _) = explorer.into_parts();
        assert_eq!(oracle.shutdowns, 1);
    }
}
