//! Picks the opponent's reply at an opponent node.
//!
//! Main mode always plays the most popular computed reply. Deep mode walks a
//! per-node shuffled order, resuming after the previous pick, and prefers
//! branches that still have unvisited leaves.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::completion;
use crate::puzzle::tree::{NodeId, PuzzleTree};
use crate::session::{DrillSession, MoveOrigin};
use crate::status;
use crate::variations::has_unvisited_leaves;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillMode {
    /// Only the most popular opponent branch
    Main,
    /// Every computed opponent branch
    Deep,
}

/// Memoized shuffle of one opponent node's edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpponentOrder {
    /// Edge indices in drill order
    pub permutation: Vec<usize>,
    pub last_pick: Option<usize>,
}

impl OpponentOrder {
    pub fn shuffled<R: Rng + ?Sized>(edge_count: usize, rng: &mut R) -> Self {
        let mut permutation: Vec<usize> = (0..edge_count).collect();
        permutation.shuffle(rng);
        Self {
            permutation,
            last_pick: None,
        }
    }

    /// Next edge to play. The cycle starts right after the previous pick, so
    /// that pick is only repeated when nothing else qualifies. Falls back to
    /// the first eligible edge when every branch is fully visited.
    pub fn next_pick(
        &self,
        eligible: impl Fn(usize) -> bool,
        unvisited: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        let n = self.permutation.len();
        let start = self
            .last_pick
            .and_then(|last| self.permutation.iter().position(|&e| e == last))
            .map_or(0, |pos| pos + 1);

        (0..n)
            .map(|k| self.permutation[(start + k) % n])
            .find(|&e| eligible(e) && unvisited(e))
            .or_else(|| self.permutation.iter().copied().find(|&e| eligible(e)))
    }
}

/// Choose the reply edge at `node`, or `None` when no edge has a computed child.
pub fn select_reply<R: Rng + ?Sized>(
    tree: &PuzzleTree,
    node: NodeId,
    mode: DrillMode,
    orders: &mut HashMap<NodeId, OpponentOrder>,
    visited: &HashSet<NodeId>,
    rng: &mut R,
) -> Option<usize> {
    let edges = tree.edges(node);
    match mode {
        DrillMode::Main => tree.main_line_edge(node),
        DrillMode::Deep => {
            let order = orders
                .entry(node)
                .or_insert_with(|| OpponentOrder::shuffled(edges.len(), rng));
            let pick = order.next_pick(
                |idx| edges[idx].child.is_some(),
                |idx| {
                    edges[idx]
                        .child
                        .is_some_and(|child| has_unvisited_leaves(tree, child, visited))
                },
            )?;
            order.last_pick = Some(pick);
            Some(pick)
        }
    }
}

/// Play the opponent's reply at the current node. Fired when the
/// opponent-thinking delay elapses.
pub fn play_reply(session: &mut DrillSession) {
    let puzzle = Arc::clone(&session.puzzle);
    let tree = &puzzle.tree;
    let node = session.current_node;

    let pick = select_reply(
        tree,
        node,
        session.drill_mode,
        &mut session.opponent_order,
        &session.visited,
        &mut session.rng,
    );
    let Some(idx) = pick else {
        completion::on_leaf_reached(session, node, None);
        return;
    };

    if let Err(err) = session.commit_move(node, idx, MoveOrigin::Opponent) {
        session.fail(err);
        return;
    }

    let edge = &tree.edges(node)[idx];
    debug!(
        puzzle_id = %puzzle.id,
        node = %node,
        reply = %edge.label,
        mode = ?session.drill_mode,
        "Opponent replied"
    );
    session.status = status::your_move(&edge.label);
    match edge.child {
        Some(child) => session.enter_node(child, None),
        None => completion::on_leaf_reached(session, node, None),
    }
}
