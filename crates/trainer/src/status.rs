//! Human-readable status lines shown next to the board.

use serde::Serialize;

use crate::puzzle::tree::{CutoffReason, NodeKind, TerminalStatus, TreeNode};
use crate::puzzle::Puzzle;

/// Evaluations at or beyond this magnitude are forced mates.
pub const MATE_SCORE: i32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub title: String,
    pub body: String,
    pub tone: Tone,
}

impl StatusMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>, tone: Tone) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tone,
        }
    }
}

/// Format a solver-relative evaluation: `+1.5`, `-0.3`, `#` for a forced mate.
pub fn format_eval(cp: i32) -> String {
    if cp >= MATE_SCORE {
        "#".to_string()
    } else if cp <= -MATE_SCORE {
        "-#".to_string()
    } else {
        format!("{:+.1}", cp as f64 / 100.0)
    }
}

fn pawns(cp: i32) -> String {
    format!("{:.1}", cp.abs() as f64 / 100.0)
}

pub fn idle(puzzle: &Puzzle) -> StatusMessage {
    StatusMessage::new(puzzle.display_title(), "Press start when you are ready.", Tone::Neutral)
}

pub fn watch_mistake(puzzle: &Puzzle) -> StatusMessage {
    StatusMessage::new(
        puzzle.opening_name.clone(),
        format!("Watch closely: your opponent is about to play {}.", puzzle.mistake_san),
        Tone::Neutral,
    )
}

pub fn find_response(puzzle: &Puzzle) -> StatusMessage {
    let body = if puzzle.cp_loss > 0 {
        format!(
            "{} throws away {} pawns. Punish it!",
            puzzle.mistake_san,
            pawns(puzzle.cp_loss)
        )
    } else {
        format!("{} is a mistake. Punish it!", puzzle.mistake_san)
    };
    StatusMessage::new("Find the best response", body, Tone::Info)
}

pub fn correct(label: &str, evaluation: Option<i32>) -> StatusMessage {
    let body = match evaluation {
        Some(cp) => format!("{label} keeps the advantage ({}).", format_eval(cp)),
        None => format!("{label} keeps the advantage."),
    };
    StatusMessage::new("Correct!", body, Tone::Success)
}

pub fn opponent_thinking() -> StatusMessage {
    StatusMessage::new("Opponent is thinking", "", Tone::Neutral)
}

pub fn your_move(opponent_label: &str) -> StatusMessage {
    StatusMessage::new(
        "Your move",
        format!("Your opponent answered {opponent_label}. Keep up the pressure."),
        Tone::Info,
    )
}

pub fn wrong_move() -> StatusMessage {
    StatusMessage::new(
        "Not quite",
        "That move lets the advantage slip.",
        Tone::Error,
    )
}

pub fn show_correction(label: &str, evaluation: Option<i32>) -> StatusMessage {
    let body = match evaluation {
        Some(cp) => format!("{label} was the move ({}). Your turn again.", format_eval(cp)),
        None => format!("{label} was the move. Your turn again."),
    };
    StatusMessage::new(format!("The best move was {label}"), body, Tone::Warning)
}

pub fn try_again() -> StatusMessage {
    StatusMessage::new(
        "Try again",
        "Find the move that keeps the advantage.",
        Tone::Info,
    )
}

pub fn hint(square: &str) -> StatusMessage {
    StatusMessage::new("Hint", format!("Look at the piece on {square}."), Tone::Info)
}

/// Short description of how a line ended.
pub fn leaf_outcome(node: &TreeNode) -> &'static str {
    match (node.kind, node.status, node.reason) {
        (NodeKind::Terminal, Some(TerminalStatus::Checkmate), _) => "Checkmate!",
        (NodeKind::Terminal, Some(TerminalStatus::Draw), _) => "The game is drawn.",
        (NodeKind::Terminal, None, _) => "Game over.",
        (NodeKind::Cutoff, _, _) => "The advantage is secured.",
        _ => "Line complete.",
    }
}

/// Log label for a cutoff reason.
pub fn cutoff_label(reason: Option<CutoffReason>) -> &'static str {
    match reason {
        Some(CutoffReason::MaxNodes) => "max_nodes",
        Some(CutoffReason::MaxDepth) => "max_depth",
        Some(CutoffReason::AdvantageSecured) => "advantage_secured",
        None => "none",
    }
}

pub fn variation_complete(outcome: &str, covered: usize, total: usize) -> StatusMessage {
    StatusMessage::new(
        outcome,
        format!("{covered} of {total} lines done. Next line coming up."),
        Tone::Success,
    )
}

pub fn clean_run_required(total: usize) -> StatusMessage {
    let lines = if total == 1 { "line" } else { "lines" };
    StatusMessage::new(
        "Almost there",
        format!("You covered all {total} {lines}, but with mistakes. Now solve it cleanly."),
        Tone::Warning,
    )
}

pub fn solved(puzzle: &Puzzle, total: usize) -> StatusMessage {
    let body = if total == 1 {
        format!("You punished {} without a mistake.", puzzle.mistake_san)
    } else {
        format!(
            "You punished {} in all {total} lines without a mistake.",
            puzzle.mistake_san
        )
    };
    StatusMessage::new("Puzzle solved!", body, Tone::Success)
}

pub fn failed(reason: &str) -> StatusMessage {
    StatusMessage::new("Puzzle unavailable", reason.to_string(), Tone::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eval() {
        assert_eq!(format_eval(150), "+1.5");
        assert_eq!(format_eval(-30), "-0.3");
        assert_eq!(format_eval(0), "+0.0");
        assert_eq!(format_eval(10_000), "#");
        assert_eq!(format_eval(-10_000), "-#");
    }

    #[test]
    fn test_leaf_outcome() {
        let mate = TreeNode {
            position: String::new(),
            kind: NodeKind::Terminal,
            reason: None,
            status: Some(TerminalStatus::Checkmate),
            edges: vec![],
        };
        assert_eq!(leaf_outcome(&mate), "Checkmate!");

        let cutoff = TreeNode {
            kind: NodeKind::Cutoff,
            status: None,
            reason: Some(CutoffReason::AdvantageSecured),
            ..mate
        };
        assert_eq!(leaf_outcome(&cutoff), "The advantage is secured.");
        assert_eq!(cutoff_label(cutoff.reason), "advantage_secured");
    }
}
