//! Parsing of individual engine response lines.

use crate::error::ParseError;
use crate::score::Score;

/// Marker of the position encoding line in the `d` command output.
pub const FEN_MARKER: &str = "Fen:";

/// The fields of an `info` line that a ranked search cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: u32,
    /// 1-based candidate rank.
    pub multipv: usize,
    pub score: Score,
    /// First move of the principal variation.
    pub mv: String,
}

impl InfoLine {
    /// Parses a search progress line such as
    /// `info depth 20 seldepth 28 multipv 2 score cp -14 nodes 1 pv e7e5 g1f3`.
    ///
    /// Lines missing any of depth, rank, score or a principal variation move
    /// are rejected.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("info") {
            return Err(ParseError::new("not an info line"));
        }

        let mut depth = None;
        let mut multipv = None;
        let mut score = None;
        let mut mv = None;

        while let Some(token) = tokens.next() {
            match token {
                "depth" if depth.is_none() => depth = Some(parse_number(tokens.next(), "depth")?),
                "multipv" if multipv.is_none() => {
                    multipv = Some(parse_number(tokens.next(), "multipv")?)
                }
                "score" if score.is_none() => {
                    let kind = tokens.next();
                    let value = parse_number(tokens.next(), "score")?;
                    score = Some(match kind {
                        Some("cp") => Score::Centipawns(value),
                        Some("mate") => Score::Mate(value),
                        other => {
                            return Err(ParseError::new(format!("unknown score kind {other:?}")));
                        }
                    });
                }
                "pv" => {
                    mv = tokens.next();
                    break;
                }
                // Free text runs to the end of the line.
                "string" => break,
                _ => {}
            }
        }

        match (depth, multipv, score, mv) {
            (Some(depth), Some(multipv), Some(score), Some(mv)) => Ok(Self {
                depth,
                multipv,
                score,
                mv: mv.to_string(),
            }),
            _ => Err(ParseError::new("incomplete info line")),
        }
    }
}

fn parse_number<T: std::str::FromStr>(token: Option<&str>, field: &str) -> Result<T, ParseError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| ParseError::new(format!("missing or invalid {field}")))
}

/// Returns the payload of a position encoding line, if `line` is one.
pub fn fen_payload(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix(FEN_MARKER)
        .map(str::trim)
        .filter(|fen| !fen.is_empty())
}

/// Returns `true` for the line that ends a search.
pub fn is_bestmove(line: &str) -> bool {
    line.trim_start().starts_with("bestmove")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_centipawn_line() {
        let line = "info depth 16 seldepth 22 multipv 1 score cp 31 nodes 523391 nps 1200000 \
                    hashfull 201 tbhits 0 time 436 pv e2e4 e7e5 g1f3";
        let info = InfoLine::parse(line).unwrap();
        assert_eq!(info.depth, 16);
        assert_eq!(info.multipv, 1);
        assert_eq!(info.score, Score::Centipawns(31));
        assert_eq!(info.mv, "e2e4");
    }

    #[test]
    fn test_parse_mate_line() {
        let info = InfoLine::parse("info depth 12 multipv 3 score mate -2 pv h7h8").unwrap();
        assert_eq!(info.multipv, 3);
        assert_eq!(info.score, Score::Mate(-2));
    }

    #[test]
    fn test_seldepth_does_not_shadow_depth() {
        let info =
            InfoLine::parse("info seldepth 30 depth 9 multipv 1 score cp 0 pv a2a3").unwrap();
        assert_eq!(info.depth, 9);
    }

    #[test]
    fn test_bound_scores_are_accepted() {
        let info =
            InfoLine::parse("info depth 20 multipv 1 score cp 45 lowerbound pv d2d4").unwrap();
        assert_eq!(info.score, Score::Centipawns(45));
    }

    #[test]
    fn test_rejects_incomplete_lines() {
        assert!(InfoLine::parse("info depth 16 currmove e2e4 currmovenumber 1").is_err());
        assert!(InfoLine::parse("info depth 16 multipv 1 score cp 31").is_err());
        assert!(InfoLine::parse("info depth 16 multipv 1 pv e2e4").is_err());
        assert!(InfoLine::parse("info depth x multipv 1 score cp 3 pv e2e4").is_err());
        assert!(InfoLine::parse("info depth 16 multipv 1 score wdl 3 pv e2e4").is_err());
        assert!(InfoLine::parse("info string NNUE evaluation enabled").is_err());
        assert!(InfoLine::parse("bestmove e2e4 ponder e7e5").is_err());
        assert!(InfoLine::parse("").is_err());
    }

    #[test]
    fn test_fen_payload() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        assert_eq!(fen_payload(&format!("Fen: {fen}")), Some(fen));
        assert_eq!(fen_payload("Fen:   "), None);
        assert_eq!(fen_payload("Sfen: lnsgkgsnl/9/9 b - 1"), None);
        assert_eq!(fen_payload("Key: 8F8F01D4562F59FB"), None);
    }

    #[test]
    fn test_is_bestmove() {
        assert!(is_bestmove("bestmove e2e4 ponder e7e5"));
        assert!(is_bestmove("bestmove (none)"));
        assert!(!is_bestmove("info depth 1 multipv 1 score cp 3 pv e2e4"));
    }
}
