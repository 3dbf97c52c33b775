//! Coverage bookkeeping once a line ends.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::puzzle::tree::{NodeId, PuzzleTree};
use crate::session::{DrillSession, Phase, Step};
use crate::status;

/// When every accepted move at `solver` ends the line, the alternatives are
/// equivalent: mark all of their leaves (and `solver` itself for childless
/// ones) as covered.
pub fn mark_equivalent_leaves(tree: &PuzzleTree, solver: NodeId, visited: &mut HashSet<NodeId>) {
    let mut accepted = tree.accepted_edges(solver).peekable();
    if accepted.peek().is_none() || !tree.accepted_edges(solver).all(|e| tree.ends_branch(e)) {
        return;
    }
    for edge in accepted {
        visited.insert(edge.child.unwrap_or(solver));
    }
}

/// Record `leaf` as covered and decide what happens next: another
/// variation, a clean-run restart, or done.
pub fn on_leaf_reached(session: &mut DrillSession, leaf: NodeId, resolved_solver: Option<NodeId>) {
    let puzzle = Arc::clone(&session.puzzle);
    let tree = &puzzle.tree;

    session.visited.insert(leaf);
    if let Some(solver) = resolved_solver {
        mark_equivalent_leaves(tree, solver, &mut session.visited);
    }
    session.in_flight = false;
    session.current_node = leaf;

    let total = session.total_required;
    let covered = session.variations_completed();
    let outcome = status::leaf_outcome(tree.node(leaf));
    info!(
        puzzle_id = %puzzle.id,
        leaf = %leaf,
        reason = status::cutoff_label(tree.node(leaf).reason),
        covered,
        total,
        had_mistake = session.had_mistake,
        "Line complete"
    );

    if covered < total {
        session.phase = Phase::Idle;
        session.status = status::variation_complete(outcome, covered, total);
        session.schedule(Step::NextVariation, session.timings.next_variation);
    } else if session.had_mistake {
        info!(puzzle_id = %puzzle.id, "Coverage reached with mistakes, clean run required");
        session.visited.clear();
        session.had_mistake = false;
        session.phase = Phase::Idle;
        session.status = status::clean_run_required(total);
        session.schedule(Step::CleanRunRestart, session.timings.clean_run_restart);
    } else {
        info!(puzzle_id = %puzzle.id, total, mode = ?session.drill_mode, "Puzzle solved");
        session.phase = Phase::Done;
        session.status = status::solved(&puzzle, total);
        session.completed = Some(puzzle.id.clone());
    }
}
