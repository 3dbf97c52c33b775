#![allow(dead_code)]

use std::sync::Arc;

use chess_core::board::move_squares;
use serde_json::{json, Value};
use trainer::{DrillSession, DrillTimings, Puzzle, PuzzleRecord, Step};

/// Position after 1.e4 e5 2.Nf3, Black to move.
pub const DAMIANO_PRE_FEN: &str =
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2";

/// After 2...f6?
pub const DAMIANO_POST_FEN: &str =
    "rnbqkbnr/pppp2pp/5p2/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 3";

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// 2...f6 punished by 3.Nxe5. Black either takes (main line, then 4.Qh5+)
/// or plays 3...Qe7 (then 4.Nf3).
pub fn damiano_record(id: &str) -> PuzzleRecord {
    record(json!({
        "id": id,
        "eco": "C40",
        "opening_name": "Damiano Defense",
        "mistake_san": "f6",
        "mistake_uci": "f7f6",
        "pre_mistake_fen": DAMIANO_PRE_FEN,
        "post_mistake_fen": DAMIANO_POST_FEN,
        "solver_color": "w",
        "root_eval": 20,
        "cp_loss": 150,
        "games": 1200,
        "tree": {
            "fen": DAMIANO_POST_FEN,
            "type": "solver",
            "moves": {
                "f3e5": {"san": "Nxe5", "cp": 130, "accepted": true, "result": {
                    "type": "opponent",
                    "moves": {
                        "f6e5": {"san": "fxe5", "probability": 60.0, "result": {
                            "type": "solver",
                            "moves": {
                                "d1h5": {"san": "Qh5+", "cp": 600, "accepted": true, "result": {
                                    "type": "cutoff", "reason": "advantage_secured"
                                }}
                            }
                        }},
                        "d8e7": {"san": "Qe7", "probability": 40.0, "result": {
                            "type": "solver",
                            "moves": {
                                "e5f3": {"san": "Nf3", "cp": 140, "accepted": true, "result": {
                                    "type": "cutoff", "reason": "advantage_secured"
                                }}
                            }
                        }}
                    }
                }},
                "f1c4": {"san": "Bc4", "cp": 40, "accepted": true},
                "a2a3": {"san": "a3", "cp": -10, "accepted": false}
            }
        }
    }))
}

/// Damiano tree where 3...fxe5 leaves two equally good finishing moves
/// (4.Qh5+ and 4.d4) and 3...Qe7 leaves one (4.Nf3).
pub fn equivalent_record(id: &str) -> PuzzleRecord {
    record(json!({
        "id": id,
        "eco": "C40",
        "opening_name": "Damiano Defense",
        "mistake_san": "f6",
        "mistake_uci": "f7f6",
        "pre_mistake_fen": DAMIANO_PRE_FEN,
        "solver_color": "w",
        "games": 800,
        "tree": {
            "type": "solver",
            "moves": {
                "f3e5": {"san": "Nxe5", "cp": 130, "accepted": true, "result": {
                    "type": "opponent",
                    "moves": {
                        "f6e5": {"san": "fxe5", "probability": 60.0, "result": {
                            "type": "solver",
                            "moves": {
                                "d1h5": {"san": "Qh5+", "cp": 600, "accepted": true, "result": {
                                    "type": "cutoff", "reason": "advantage_secured"
                                }},
                                "d2d4": {"san": "d4", "cp": 300, "accepted": true, "result": {
                                    "type": "cutoff", "reason": "advantage_secured"
                                }}
                            }
                        }},
                        "d8e7": {"san": "Qe7", "probability": 40.0, "result": {
                            "type": "solver",
                            "moves": {
                                "e5f3": {"san": "Nf3", "cp": 140, "accepted": true, "result": {
                                    "type": "cutoff", "reason": "advantage_secured"
                                }}
                            }
                        }}
                    }
                }}
            }
        }
    }))
}

/// Damiano tree with a second accepted move, 3.Bc4, whose only reply is
/// 3...Nc6. The short line can be replayed after it is covered.
pub fn side_line_record(id: &str) -> PuzzleRecord {
    record(json!({
        "id": id,
        "eco": "C40",
        "opening_name": "Damiano Defense",
        "mistake_san": "f6",
        "mistake_uci": "f7f6",
        "pre_mistake_fen": DAMIANO_PRE_FEN,
        "solver_color": "w",
        "games": 500,
        "tree": {
            "type": "solver",
            "moves": {
                "f3e5": {"san": "Nxe5", "cp": 130, "accepted": true, "result": {
                    "type": "opponent",
                    "moves": {
                        "f6e5": {"san": "fxe5", "probability": 60.0, "result": {"type": "cutoff"}},
                        "d8e7": {"san": "Qe7", "probability": 40.0, "result": {"type": "cutoff"}}
                    }
                }},
                "f1c4": {"san": "Bc4", "cp": 60, "accepted": true, "result": {
                    "type": "opponent",
                    "moves": {
                        "b8c6": {"san": "Nc6", "probability": 100.0, "result": {"type": "cutoff"}}
                    }
                }}
            }
        }
    }))
}

/// Root is an opponent node: 1...e5 (popular) ends immediately, 1...c5 leads
/// to a solver move that ends the game.
pub fn fork_record(id: &str) -> PuzzleRecord {
    record(json!({
        "id": id,
        "eco": "B20",
        "opening_name": "Fork Test",
        "mistake_san": "e4",
        "mistake_uci": "e2e4",
        "pre_mistake_fen": START_FEN,
        "solver_color": "w",
        "games": 10,
        "tree": {
            "type": "opponent",
            "moves": {
                "e7e5": {"san": "e5", "probability": 70.0, "result": {"type": "cutoff"}},
                "c7c5": {"san": "c5", "probability": 30.0, "result": {
                    "type": "solver",
                    "moves": {
                        "g1f3": {"san": "Nf3", "cp": 50, "accepted": true, "result": {
                            "type": "terminal", "status": "draw"
                        }}
                    }
                }}
            }
        }
    }))
}

pub fn record(value: Value) -> PuzzleRecord {
    serde_json::from_value(value).expect("fixture record should deserialize")
}

pub fn puzzle(record: &PuzzleRecord) -> Arc<Puzzle> {
    Arc::new(Puzzle::from_record(record).expect("fixture puzzle should load"))
}

pub fn session(record: &PuzzleRecord, seed: u64) -> DrillSession {
    DrillSession::with_seed(puzzle(record), DrillTimings::default(), seed)
}

/// Fire the next queued step, returning which one it was.
pub fn fire_next(session: &mut DrillSession) -> Option<Step> {
    let mut queued = session.take_scheduled();
    assert!(queued.len() <= 1, "at most one step is pending at a time");
    let next = queued.pop()?;
    session.fire(next.ticket, next.step);
    Some(next.step)
}

/// Fire queued steps until none are left.
pub fn run_steps(session: &mut DrillSession) -> Vec<Step> {
    let mut fired = Vec::new();
    while let Some(step) = fire_next(session) {
        fired.push(step);
    }
    fired
}

/// Drag the piece on the move's source square.
pub fn play(session: &mut DrillSession, uci: &str) -> bool {
    let (from, to) = move_squares(uci).expect("fixture move should parse");
    let piece = session.piece_at(from).expect("a piece on the source square");
    session.attempt_move(from, to, piece)
}

/// Play the best accepted move at the current solver node.
pub fn play_best(session: &mut DrillSession) -> bool {
    let node = session.current_node();
    let tree = &session.puzzle().tree;
    let idx = tree.best_accepted(node).expect("solver node has an accepted move");
    let uci = tree.edges(node)[idx].move_id.clone();
    play(session, &uci)
}

pub fn last_label(session: &DrillSession) -> String {
    session
        .history()
        .last()
        .map(|h| h.label.clone())
        .unwrap_or_default()
}
