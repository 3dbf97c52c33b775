//! Judges the solver's move attempts.

use std::sync::Arc;

use chess_core::board::{is_promotion_square, move_id, move_squares};
use shakmaty::{Piece, Role, Square};
use tracing::{debug, info};

use crate::completion;
use crate::error::TrainerError;
use crate::puzzle::tree::{NodeId, PuzzleTree};
use crate::session::{DrillSession, MoveOrigin, Phase, Step};
use crate::status;

/// Move identifier for a piece dropped on `to`. Pawns reaching the last rank
/// promote to a queen unless the only accepted promotion on that square pair
/// is to another piece.
pub fn build_move_id(
    tree: &PuzzleTree,
    node: NodeId,
    from: Square,
    to: Square,
    piece: Piece,
) -> String {
    if !is_promotion_square(piece, to) {
        return move_id(from, to, None);
    }
    let prefix = move_id(from, to, None);
    let promotions: Vec<&str> = tree
        .accepted_edges(node)
        .map(|e| e.move_id.as_str())
        .filter(|id| id.len() == prefix.len() + 1 && id.starts_with(&prefix))
        .collect();
    let role = match promotions.as_slice() {
        [only] => only
            .chars()
            .last()
            .and_then(Role::from_char)
            .unwrap_or(Role::Queen),
        _ => Role::Queen,
    };
    move_id(from, to, Some(role))
}

/// Try the solver's move. Returns true when it was accepted.
///
/// Attempts outside the solver's turn, or while another attempt is being
/// resolved, are dropped without any effect.
pub fn attempt_move(session: &mut DrillSession, from: Square, to: Square, piece: Piece) -> bool {
    if session.phase != Phase::SolverTurn || session.in_flight {
        debug!(
            puzzle_id = %session.puzzle.id,
            %from,
            %to,
            phase = ?session.phase,
            "Dropping move attempt"
        );
        return false;
    }
    session.in_flight = true;
    session.marks.clear_selection();
    session.marks.hint = None;

    let puzzle = Arc::clone(&session.puzzle);
    let tree = &puzzle.tree;
    let node = session.current_node;
    let uci = build_move_id(tree, node, from, to, piece);

    match tree.find_edge(node, &uci) {
        Some(idx) if tree.edges(node)[idx].accepted => {
            if let Err(err) = session.commit_move(node, idx, MoveOrigin::Solver) {
                session.fail(err);
                return false;
            }
            let edge = &tree.edges(node)[idx];
            info!(puzzle_id = %puzzle.id, node = %node, mv = %edge.label, "Accepted move");
            session.status = status::correct(&edge.label, edge.evaluation);
            match edge.child {
                Some(child) => session.enter_node(child, Some(node)),
                None => completion::on_leaf_reached(session, node, Some(node)),
            }
            true
        }
        _ => {
            info!(puzzle_id = %puzzle.id, node = %node, mv = %uci, "Rejected move");
            session.had_mistake = true;
            session.phase = Phase::ShowingCorrection;
            session.marks.error = Some(to);
            session.status = status::wrong_move();
            session.schedule(Step::ShowCorrection, session.timings.error_flash);
            false
        }
    }
}

/// Put the best accepted move on the displayed board. The committed position
/// is left alone.
pub fn show_correction(session: &mut DrillSession) {
    let puzzle = Arc::clone(&session.puzzle);
    let node = session.current_node;
    let Some(idx) = puzzle.tree.best_accepted(node) else {
        session.fail(TrainerError::corrupt(
            &puzzle.id,
            format!("solver node {node} has no accepted move"),
        ));
        return;
    };
    let edge = &puzzle.tree.edges(node)[idx];
    match session.position.apply(&edge.move_id) {
        Ok(board) => session.display = board,
        Err(err) => {
            session.fail(TrainerError::corrupt(
                &puzzle.id,
                format!("edge {} at node {node} does not apply: {err}", edge.move_id),
            ));
            return;
        }
    }
    session.marks.error = None;
    session.marks.correction = move_squares(&edge.move_id).map(|(_, to)| to);
    session.status = status::show_correction(&edge.label, edge.evaluation);
    session.schedule(Step::RevertCorrection, session.timings.correction_hold);
}

/// Restore the committed position and hand the move back to the solver.
pub fn revert_correction(session: &mut DrillSession) {
    session.display = session.position.clone();
    session.marks.correction = None;
    session.marks.error = None;
    session.phase = Phase::SolverTurn;
    session.in_flight = false;
    session.status = status::try_again();
}
