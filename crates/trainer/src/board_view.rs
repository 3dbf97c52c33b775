//! What the board renderer draws on top of the position, and the
//! click-to-move input path.

use std::collections::BTreeMap;

use serde::Serialize;
use shakmaty::Square;
use tracing::debug;

use crate::arbiter;
use crate::session::{DrillSession, Phase};
use crate::status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightStyle {
    LastMove,
    Hint,
    Selected,
    LegalMove,
    Correction,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardMarks {
    pub last_move: Option<(Square, Square)>,
    pub selected: Option<Square>,
    /// Legal destination dots for the selected piece
    pub legal_targets: Vec<Square>,
    pub hint: Option<Square>,
    pub error: Option<Square>,
    pub correction: Option<Square>,
}

impl BoardMarks {
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.legal_targets.clear();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Square to style map. Later layers win: flashes over selection over
    /// the last-move trail.
    pub fn highlights(&self) -> BTreeMap<Square, HighlightStyle> {
        let mut map = BTreeMap::new();
        if let Some((from, to)) = self.last_move {
            map.insert(from, HighlightStyle::LastMove);
            map.insert(to, HighlightStyle::LastMove);
        }
        if let Some(square) = self.hint {
            map.insert(square, HighlightStyle::Hint);
        }
        for &square in &self.legal_targets {
            map.insert(square, HighlightStyle::LegalMove);
        }
        if let Some(square) = self.selected {
            map.insert(square, HighlightStyle::Selected);
        }
        if let Some(square) = self.correction {
            map.insert(square, HighlightStyle::Correction);
        }
        if let Some(square) = self.error {
            map.insert(square, HighlightStyle::Error);
        }
        map
    }
}

/// Handle a click on `square`. Selecting a solver piece shows its legal
/// destinations; clicking one of them submits the move. Returns whether a
/// submitted move was accepted.
pub fn select_square(session: &mut DrillSession, square: Square) -> bool {
    if session.phase != Phase::SolverTurn || session.in_flight {
        return false;
    }

    if let Some(from) = session.marks.selected {
        if from == square {
            session.marks.clear_selection();
            return false;
        }
        if session.marks.legal_targets.contains(&square) {
            session.marks.clear_selection();
            let Some(piece) = session.display.piece_at(from) else {
                return false;
            };
            return arbiter::attempt_move(session, from, square, piece);
        }
    }

    match session.display.piece_at(square) {
        Some(piece) if piece.color == session.puzzle.solver_color => {
            session.marks.selected = Some(square);
            session.marks.legal_targets = session.display.legal_destinations(square);
            debug!(
                puzzle_id = %session.puzzle.id,
                %square,
                targets = session.marks.legal_targets.len(),
                "Selected piece"
            );
        }
        _ => session.marks.clear_selection(),
    }
    false
}

/// Reveal the source square of the best accepted move without playing it.
pub fn request_hint(session: &mut DrillSession) -> Option<Square> {
    if session.phase != Phase::SolverTurn {
        return None;
    }
    let tree = &session.puzzle.tree;
    let idx = tree.best_accepted(session.current_node)?;
    let (from, _) =
        chess_core::board::move_squares(&tree.edges(session.current_node)[idx].move_id)?;
    session.marks.hint = Some(from);
    session.status = status::hint(&from.to_string());
    Some(from)
}
