//! Evaluation values attached to nodes.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Evaluation from the perspective of the side to move.
///
/// Mate distances follow the engine convention: a positive count means the
/// side to move mates in that many moves, zero or a negative count means the
/// side to move is mated (`Mate(0)` is a position that is already mate).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Score {
    /// Centipawn evaluation.
    Centipawns(i32),
    /// Signed move count to a forced mate.
    Mate(i32),
}

impl Score {
    /// Neutral evaluation given to a fresh root.
    pub const ZERO: Self = Score::Centipawns(0);

    /// Returns `true` if this is a mate-distance value.
    #[inline]
    pub fn is_mate(self) -> bool {
        matches!(self, Score::Mate(_))
    }

    /// Returns `true` if the side to move delivers mate.
    #[inline]
    pub fn is_winning_mate(self) -> bool {
        matches!(self, Score::Mate(n) if n > 0)
    }

    /// Returns `true` if the side to move gets mated.
    #[inline]
    pub fn is_losing_mate(self) -> bool {
        matches!(self, Score::Mate(n) if n <= 0)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "{cp}"),
            Score::Mate(n) => write!(f, "#{n}"),
        }
    }
}

impl FromStr for Score {
    type Err = ParseError;

    /// Parses the textual form produced by `Display`: `"-35"` or `"#4"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (is_mate, digits) = match s.strip_prefix('#') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let value = digits
            .parse::<i32>()
            .map_err(|_| ParseError::new(format!("invalid score: {s:?}")))?;
        Ok(if is_mate {
            Score::Mate(value)
        } else {
            Score::Centipawns(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Score::Centipawns(-35).to_string(), "-35");
        assert_eq!(Score::Mate(3).to_string(), "#3");
        assert_eq!(Score::Mate(-2).to_string(), "#-2");
        assert_eq!(Score::Mate(0).to_string(), "#0");
    }

    #[test]
    fn test_parse() {
        assert_eq!("120".parse::<Score>().unwrap(), Score::Centipawns(120));
        assert_eq!(" -7 ".parse::<Score>().unwrap(), Score::Centipawns(-7));
        assert_eq!("#-4".parse::<Score>().unwrap(), Score::Mate(-4));
        assert!("#".parse::<Score>().is_err());
        assert!("cp 12".parse::<Score>().is_err());
    }

    #[test]
    fn test_mate_predicates() {
        assert!(Score::Mate(1).is_winning_mate());
        assert!(Score::Mate(0).is_losing_mate());
        assert!(Score::Mate(-3).is_losing_mate());
        assert!(!Score::Centipawns(900).is_mate());
    }
}
