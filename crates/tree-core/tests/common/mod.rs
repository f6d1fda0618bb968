use std::collections::HashMap;

use tree_core::OracleError;
use tree_core::Score;
use tree_core::oracle::{Oracle, PositionSetup, RankedMove};

pub const START: &str = "start";

/// Oracle that answers from tables.
///
/// Child keys are `parent/move`, unless a transposition maps that path to
/// another key.
#[derive(Default)]
pub struct ScriptedOracle {
    searches: HashMap<String, Vec<RankedMove>>,
    transpositions: HashMap<String, String>,
    pub searches_run: usize,
    pub shutdowns: usize,
}

impl ScriptedOracle {
    pub fn search(mut self, key: &str, ranked: &[(&str, Score)]) -> Self {
        let ranked = ranked
            .iter()
            .map(|(mv, score)| RankedMove::new(*mv, *score))
            .collect();
        self.searches.insert(key.to_string(), ranked);
        self
    }

    pub fn transpose(mut self, path: &str, key: &str) -> Self {
        self.transpositions.insert(path.to_string(), key.to_string());
        self
    }
}

impl Oracle for ScriptedOracle {
    fn position_key(&mut self, setup: &PositionSetup<'_>) -> Result<String, OracleError> {
        match setup {
            PositionSetup::StartPos => Ok(START.to_string()),
            PositionSetup::Fen { fen, moves } => {
                let mut path = fen.to_string();
                for mv in moves.iter() {
                    path.push('/');
                    path.push_str(mv);
                }
                Ok(self.transpositions.get(&path).cloned().unwrap_or(path))
            }
        }
    }

    fn ranked_candidates(
        &mut self,
        position_key: &str,
        _depth: u32,
        limit: usize,
    ) -> Result<Vec<RankedMove>, OracleError> {
        self.searches_run += 1;
        let mut ranked = self
            .searches
            .get(position_key)
            .cloned()
            .unwrap_or_default();
        ranked.truncate(limit);
        Ok(ranked)
    }

    fn shutdown(&mut self) -> Result<(), OracleError> {
        self.shutdowns += 1;
        Ok(())
    }
}
