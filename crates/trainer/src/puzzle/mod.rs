//! Puzzle records and the catalog's grouping types

pub mod tree;

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::error::TrainerError;
pub use tree::{MoveEdge, NodeId, NodeKind, PuzzleTree, RawNode, TreeNode};

/// A puzzle exactly as the generator writes it and the catalog serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleRecord {
    pub id: String,
    #[serde(default)]
    pub eco: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub mistake_san: String,
    pub mistake_uci: String,
    pub pre_mistake_fen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_mistake_fen: Option<String>,
    pub solver_color: String,
    #[serde(default)]
    pub root_eval: i32,
    #[serde(default)]
    pub cp_loss: i32,
    #[serde(default)]
    pub games: i64,
    pub tree: RawNode,
}

/// An immutable puzzle, tree flattened.
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub id: String,
    pub eco: String,
    pub opening_name: String,
    pub title: Option<String>,
    pub mistake_san: String,
    pub mistake_uci: String,
    pub pre_mistake_fen: String,
    pub solver_color: Color,
    pub root_eval: i32,
    pub cp_loss: i32,
    /// How often the blunder was played historically
    pub games: i64,
    pub tree: PuzzleTree,
}

impl Puzzle {
    pub fn from_record(record: &PuzzleRecord) -> Result<Self, TrainerError> {
        let solver_color = chess_core::board::parse_color(&record.solver_color).ok_or_else(|| {
            TrainerError::corrupt(
                &record.id,
                format!("unknown solver color {:?}", record.solver_color),
            )
        })?;

        Ok(Self {
            id: record.id.clone(),
            eco: record.eco.clone(),
            opening_name: record
                .opening_name
                .clone()
                .unwrap_or_else(|| record.eco.clone()),
            title: record.title.clone(),
            mistake_san: record.mistake_san.clone(),
            mistake_uci: record.mistake_uci.clone(),
            pre_mistake_fen: record.pre_mistake_fen.clone(),
            solver_color,
            root_eval: record.root_eval,
            cp_loss: record.cp_loss,
            games: record.games,
            tree: PuzzleTree::from_raw(&record.tree),
        })
    }

    /// Display title, e.g. "Punishing f6 in C40".
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Punishing {} in {}", self.mistake_san, self.opening_name))
    }

    /// Structural check: every solver node must offer at least one accepted move.
    pub fn validate(&self) -> Result<(), TrainerError> {
        for id in self.tree.ids() {
            if self.tree.kind(id) == NodeKind::Solver && self.tree.accepted_edges(id).next().is_none()
            {
                return Err(TrainerError::corrupt(
                    &self.id,
                    format!("solver node {id} has no accepted move"),
                ));
            }
        }
        Ok(())
    }
}

/// One opening in the catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleGroup {
    #[serde(rename = "opening_name")]
    pub name: String,
    #[serde(default)]
    pub eco_codes: Vec<String>,
    #[serde(rename = "puzzle_count")]
    pub total_count: i64,
    #[serde(default)]
    pub completed_count: i64,
    #[serde(rename = "sample_fen", default)]
    pub sample_position: String,
}

/// Puzzles of one group plus the ids this user already completed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleSet {
    pub puzzles: Vec<PuzzleRecord>,
    #[serde(default)]
    pub completed_ids: Vec<String>,
}

impl PuzzleSet {
    /// First puzzle after `after` (or from the start) that is not yet completed.
    pub fn next_unsolved(&self, after: Option<&str>) -> Option<&PuzzleRecord> {
        let start = after
            .and_then(|id| self.puzzles.iter().position(|p| p.id == id))
            .map_or(0, |idx| idx + 1);
        self.puzzles[start.min(self.puzzles.len())..]
            .iter()
            .find(|p| !self.completed_ids.contains(&p.id))
    }
}
