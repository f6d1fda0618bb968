use colored::{ColoredString, Colorize};
use tree_core::Score;

/// Console palette for exploration output.
///
/// Evaluations read green for the side to move and red against it; engine
/// metadata (paths, counts, save notices) stays in muted slate tones.
pub trait ThemeColor: Colorize + Sized {
    /// Headings and analysis numbers.
    fn primary(self) -> ColoredString {
        self.truecolor(120, 190, 240)
    }

    fn subtext(self) -> ColoredString {
        self.truecolor(120, 128, 150)
    }

    /// Scores favoring the side to move.
    fn success(self) -> ColoredString {
        self.truecolor(110, 220, 140)
    }

    /// Scores against the side to move.
    fn failure(self) -> ColoredString {
        self.truecolor(235, 100, 100)
    }

    fn text(self) -> ColoredString {
        self.truecolor(225, 225, 215)
    }

    /// Retries and interruptions.
    fn warning(self) -> ColoredString {
        self.truecolor(240, 190, 90)
    }
}

impl<T: Colorize> ThemeColor for T {}

/// Renders a score colored by who it favors; centipawns carry an explicit sign.
pub fn score(score: Score) -> ColoredString {
    let text = match score {
        Score::Centipawns(cp) if cp > 0 => format!("+{cp}"),
        other => other.to_string(),
    };
    if score.is_winning_mate() {
        text.success().bold()
    } else if score.is_losing_mate() {
        text.failure().bold()
    } else {
        match score {
            Score::Centipawns(cp) if cp > 0 => text.success(),
            Score::Centipawns(cp) if cp < 0 => text.failure(),
            _ => text.text(),
        }
    }
}
