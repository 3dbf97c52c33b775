//! Trainer error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corrupt puzzle {puzzle_id}: {reason}")]
    CorruptPuzzle { puzzle_id: String, reason: String },

    #[error("Board error: {0}")]
    Board(#[from] chess_core::BoardError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Puzzle not found: {0}")]
    PuzzleNotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrainerError {
    pub fn corrupt(puzzle_id: &str, reason: impl Into<String>) -> Self {
        TrainerError::CorruptPuzzle {
            puzzle_id: puzzle_id.to_string(),
            reason: reason.into(),
        }
    }
}
