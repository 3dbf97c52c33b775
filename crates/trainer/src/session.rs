//! Drill session state machine.
//!
//! The session is synchronous and owns no timers. Every delayed step is
//! queued as a [`Scheduled`] record carrying a [`Ticket`]; whoever drives the
//! session sleeps for the delay and hands the ticket back to [`DrillSession::fire`].
//! Any reset bumps the generation, so tickets from an earlier run are ignored.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chess_core::board::move_squares;
use chess_core::movetext::format_movetext;
use chess_core::Board;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use shakmaty::{Color, Piece, Square};
use tracing::{debug, error, info};

use crate::arbiter;
use crate::board_view::{self, BoardMarks, HighlightStyle};
use crate::completion;
use crate::config::DrillTimings;
use crate::error::TrainerError;
use crate::opponent::{self, DrillMode, OpponentOrder};
use crate::puzzle::tree::{NodeId, NodeKind};
use crate::puzzle::Puzzle;
use crate::status::{self, StatusMessage};
use crate::variations;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    ShowMistake,
    SolverTurn,
    OpponentThinking,
    ShowingCorrection,
    Done,
    /// Puzzle data turned out to be unplayable
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOrigin {
    Mistake,
    Solver,
    Opponent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub label: String,
    pub move_id: String,
    pub origin: MoveOrigin,
}

/// Identifies the session run a delayed step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub session_id: u64,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Play the blunder and hand the board to the solver
    RevealMistake,
    OpponentReply,
    /// Put the best accepted move on the board after a wrong attempt
    ShowCorrection,
    /// Take the correction back and let the solver try again
    RevertCorrection,
    NextVariation,
    /// Restart at the post-blunder position after a run with mistakes
    CleanRunRestart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub ticket: Ticket,
    pub delay: Duration,
    pub step: Step,
}

pub struct DrillSession {
    pub(crate) puzzle: Arc<Puzzle>,
    pub(crate) timings: DrillTimings,
    pub(crate) id: u64,
    pub(crate) generation: u64,
    pub(crate) phase: Phase,
    pub(crate) current_node: NodeId,
    /// Pre-blunder position, `None` when the puzzle's FEN is unusable
    pub(crate) start_position: Option<Board>,
    /// Committed position
    pub(crate) position: Board,
    /// What the board shows; differs from `position` while a correction is up
    pub(crate) display: Board,
    pub(crate) visited: HashSet<NodeId>,
    pub(crate) drill_mode: DrillMode,
    pub(crate) total_required: usize,
    pub(crate) opponent_order: HashMap<NodeId, OpponentOrder>,
    pub(crate) had_mistake: bool,
    pub(crate) history: Vec<HistoryEntry>,
    pub(crate) marks: BoardMarks,
    pub(crate) status: StatusMessage,
    pub(crate) runs: u32,
    /// Set while a move attempt is being resolved
    pub(crate) in_flight: bool,
    pub(crate) rng: StdRng,
    pub(crate) outbox: Vec<Scheduled>,
    pub(crate) completed: Option<String>,
    pub(crate) error: Option<String>,
}

impl DrillSession {
    pub fn new(puzzle: Arc<Puzzle>, timings: DrillTimings) -> Self {
        Self::with_rng(puzzle, timings, StdRng::from_entropy())
    }

    pub fn with_seed(puzzle: Arc<Puzzle>, timings: DrillTimings, seed: u64) -> Self {
        Self::with_rng(puzzle, timings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(puzzle: Arc<Puzzle>, timings: DrillTimings, rng: StdRng) -> Self {
        let root = puzzle.tree.root();
        let total_required = variations::count_main_line_variations(&puzzle.tree, root);
        let start_position = Board::from_fen(&puzzle.pre_mistake_fen);
        let mut session = Self {
            timings,
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            phase: Phase::Idle,
            current_node: root,
            start_position: start_position.as_ref().ok().cloned(),
            position: start_position.as_ref().ok().cloned().unwrap_or_default(),
            display: start_position.as_ref().ok().cloned().unwrap_or_default(),
            visited: HashSet::new(),
            drill_mode: DrillMode::Main,
            total_required,
            opponent_order: HashMap::new(),
            had_mistake: false,
            history: Vec::new(),
            marks: BoardMarks::default(),
            status: status::idle(&puzzle),
            runs: 0,
            in_flight: false,
            rng,
            outbox: Vec::new(),
            completed: None,
            error: None,
            puzzle,
        };
        if let Err(err) = start_position {
            session.fail(err.into());
        } else if let Err(err) = session.puzzle.validate() {
            session.fail(err);
        }
        session
    }

    // ---- Page-facing operations ----

    /// Begin a run from the pre-blunder position. Coverage is kept.
    pub fn start(&mut self) {
        if self.phase == Phase::Failed {
            debug!(puzzle_id = %self.puzzle.id, "Ignoring start on failed puzzle");
            return;
        }
        self.begin_run(true);
    }

    /// Full reset: coverage, mistakes and shuffle orders are cleared.
    pub fn retry(&mut self) {
        if self.phase == Phase::Failed {
            return;
        }
        self.visited.clear();
        self.opponent_order.clear();
        self.had_mistake = false;
        self.runs = 0;
        info!(puzzle_id = %self.puzzle.id, mode = ?self.drill_mode, "Retrying puzzle");
        self.begin_run(true);
    }

    /// Require every opponent branch and restart the puzzle.
    pub fn switch_to_deep_mode(&mut self) {
        if self.phase == Phase::Failed {
            return;
        }
        let tree = &self.puzzle.tree;
        self.drill_mode = DrillMode::Deep;
        self.total_required = variations::count_all_variations(tree, tree.root());
        self.visited.clear();
        self.opponent_order.clear();
        self.had_mistake = false;
        info!(
            puzzle_id = %self.puzzle.id,
            total = self.total_required,
            "Switched to deep drill"
        );
        self.begin_run(true);
    }

    pub fn attempt_move(&mut self, from: Square, to: Square, piece: Piece) -> bool {
        arbiter::attempt_move(self, from, to, piece)
    }

    pub fn select_square(&mut self, square: Square) -> bool {
        board_view::select_square(self, square)
    }

    pub fn request_hint(&mut self) -> Option<Square> {
        board_view::request_hint(self)
    }

    /// Run a delayed step. Tickets from a superseded run, or steps that no
    /// longer match the phase, do nothing.
    pub fn fire(&mut self, ticket: Ticket, step: Step) {
        if ticket != self.ticket() {
            debug!(
                puzzle_id = %self.puzzle.id,
                ?step,
                stale_generation = ticket.generation,
                generation = self.generation,
                "Dropping stale step"
            );
            return;
        }
        match (step, self.phase) {
            (Step::RevealMistake, Phase::ShowMistake) => self.reveal_mistake(),
            (Step::OpponentReply, Phase::OpponentThinking) => opponent::play_reply(self),
            (Step::ShowCorrection, Phase::ShowingCorrection) => arbiter::show_correction(self),
            (Step::RevertCorrection, Phase::ShowingCorrection) => {
                arbiter::revert_correction(self)
            }
            (Step::NextVariation, Phase::Idle) => self.begin_run(true),
            (Step::CleanRunRestart, Phase::Idle) => self.begin_run(false),
            (step, phase) => {
                debug!(puzzle_id = %self.puzzle.id, ?step, ?phase, "Step does not apply");
            }
        }
    }

    /// Steps queued since the last call, for the driver to schedule.
    pub fn take_scheduled(&mut self) -> Vec<Scheduled> {
        std::mem::take(&mut self.outbox)
    }

    /// Puzzle id to report as completed, once per solve.
    pub fn take_completed(&mut self) -> Option<String> {
        self.completed.take()
    }

    // ---- Accessors ----

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn ticket(&self) -> Ticket {
        Ticket {
            session_id: self.id,
            generation: self.generation,
        }
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> &StatusMessage {
        &self.status
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Position the board should show.
    pub fn position(&self) -> &Board {
        &self.display
    }

    pub fn committed_position(&self) -> &Board {
        &self.position
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.display.piece_at(square)
    }

    pub fn orientation(&self) -> Color {
        self.puzzle.solver_color
    }

    pub fn highlights(&self) -> BTreeMap<Square, HighlightStyle> {
        self.marks.highlights()
    }

    pub fn current_node(&self) -> NodeId {
        self.current_node
    }

    pub fn visited(&self) -> &HashSet<NodeId> {
        &self.visited
    }

    pub fn drill_mode(&self) -> DrillMode {
        self.drill_mode
    }

    pub fn had_mistake(&self) -> bool {
        self.had_mistake
    }

    pub fn variations_completed(&self) -> usize {
        let tree = &self.puzzle.tree;
        variations::count_covered_variations(tree, tree.root(), &self.visited)
            .min(self.total_required)
    }

    pub fn total_required(&self) -> usize {
        self.total_required
    }

    pub fn has_deep_variations(&self) -> bool {
        let tree = &self.puzzle.tree;
        variations::has_deep_variations(tree, tree.root())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// History as numbered movetext, e.g. `2...f6 3. Nxe5 fxe5`.
    pub fn movetext(&self) -> String {
        let labels: Vec<&str> = self.history.iter().map(|h| h.label.as_str()).collect();
        match &self.start_position {
            Some(start) => format_movetext(start.fullmove_number(), start.turn(), &labels),
            None => labels.join(" "),
        }
    }

    // ---- Transitions ----

    pub(crate) fn schedule(&mut self, step: Step, delay: Duration) {
        self.outbox.push(Scheduled {
            ticket: self.ticket(),
            delay,
            step,
        });
    }

    /// Reset to the pre-blunder position and either narrate the blunder
    /// (`narrate`) or play it immediately.
    fn begin_run(&mut self, narrate: bool) {
        self.generation += 1;
        self.outbox.clear();
        self.in_flight = false;
        self.history.clear();
        self.marks.reset();
        self.current_node = self.puzzle.tree.root();

        let Some(start) = self.start_position.clone() else {
            self.fail(TrainerError::corrupt(&self.puzzle.id, "missing start position"));
            return;
        };
        self.position = start.clone();
        self.display = start;

        let first_run = self.runs == 0;
        self.runs += 1;
        info!(
            puzzle_id = %self.puzzle.id,
            run = self.runs,
            mode = ?self.drill_mode,
            covered = self.variations_completed(),
            total = self.total_required,
            "Starting drill run"
        );

        if narrate {
            self.phase = Phase::ShowMistake;
            self.status = status::watch_mistake(&self.puzzle);
            let delay = if first_run {
                self.timings.mistake_first
            } else {
                self.timings.mistake_repeat
            };
            self.schedule(Step::RevealMistake, delay);
        } else {
            self.reveal_mistake();
        }
    }

    fn reveal_mistake(&mut self) {
        let puzzle = Arc::clone(&self.puzzle);
        let next = match self.position.apply(&puzzle.mistake_uci) {
            Ok(next) => next,
            Err(err) => {
                self.fail(TrainerError::corrupt(
                    &puzzle.id,
                    format!("blunder {} does not apply: {err}", puzzle.mistake_uci),
                ));
                return;
            }
        };
        self.position = next;
        self.display = self.position.clone();
        self.marks.last_move = move_squares(&puzzle.mistake_uci);
        self.history.push(HistoryEntry {
            label: puzzle.mistake_san.clone(),
            move_id: puzzle.mistake_uci.clone(),
            origin: MoveOrigin::Mistake,
        });

        let root = puzzle.tree.root();
        self.status = match puzzle.tree.kind(root) {
            NodeKind::Opponent => status::opponent_thinking(),
            _ => status::find_response(&puzzle),
        };
        self.enter_node(root, None);
    }

    /// Move the session onto `id`. `resolved_solver` is the solver node whose
    /// move led here, if any, for completion bookkeeping.
    pub(crate) fn enter_node(&mut self, id: NodeId, resolved_solver: Option<NodeId>) {
        let puzzle = Arc::clone(&self.puzzle);
        let tree = &puzzle.tree;
        let kind = tree.kind(id);

        if kind == NodeKind::Solver && tree.accepted_edges(id).next().is_none() {
            self.fail(TrainerError::corrupt(
                &puzzle.id,
                format!("solver node {id} has no accepted move"),
            ));
            return;
        }
        if tree.is_leaf(id) {
            completion::on_leaf_reached(self, id, resolved_solver);
            return;
        }

        self.current_node = id;
        match kind {
            NodeKind::Opponent => {
                if tree.edges(id).iter().all(|e| e.child.is_none()) {
                    completion::on_leaf_reached(self, id, resolved_solver);
                    return;
                }
                self.phase = Phase::OpponentThinking;
                self.schedule(Step::OpponentReply, self.timings.opponent_reply);
            }
            _ => {
                self.phase = Phase::SolverTurn;
                self.in_flight = false;
            }
        }
    }

    /// Play edge `idx` of `node` on the committed position and record it.
    pub(crate) fn commit_move(
        &mut self,
        node: NodeId,
        idx: usize,
        origin: MoveOrigin,
    ) -> Result<(), TrainerError> {
        let edge = &self.puzzle.tree.edges(node)[idx];
        let next = self.position.apply(&edge.move_id).map_err(|err| {
            TrainerError::corrupt(
                &self.puzzle.id,
                format!("edge {} at node {node} does not apply: {err}", edge.move_id),
            )
        })?;
        self.marks.last_move = move_squares(&edge.move_id);
        self.history.push(HistoryEntry {
            label: edge.label.clone(),
            move_id: edge.move_id.clone(),
            origin,
        });
        self.position = next;
        self.display = self.position.clone();
        Ok(())
    }

    /// Leave the drill for good. Pending steps become stale.
    pub(crate) fn fail(&mut self, err: TrainerError) {
        error!(puzzle_id = %self.puzzle.id, error = %err, "Puzzle failed");
        self.generation += 1;
        self.outbox.clear();
        self.in_flight = false;
        self.phase = Phase::Failed;
        self.status = status::failed(&err.to_string());
        self.error = Some(err.to_string());
    }
}

impl std::fmt::Debug for DrillSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrillSession")
            .field("puzzle_id", &self.puzzle.id)
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("phase", &self.phase)
            .field("current_node", &self.current_node)
            .field("drill_mode", &self.drill_mode)
            .field("visited", &self.visited.len())
            .field("total_required", &self.total_required)
            .field("had_mistake", &self.had_mistake)
            .finish()
    }
}
