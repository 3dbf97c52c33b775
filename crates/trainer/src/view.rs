use std::collections::BTreeMap;

use serde::Serialize;
use shakmaty::Color;

use crate::board_view::HighlightStyle;
use crate::opponent::DrillMode;
use crate::session::{DrillSession, HistoryEntry, Phase};
use crate::status::StatusMessage;

/// Everything a front-end needs to draw one frame of a drill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillView {
    pub puzzle_id: String,
    pub title: String,
    pub phase: Phase,
    pub status: StatusMessage,
    pub fen: String,
    /// `"white"` or `"black"`, the solver's side
    pub orientation: &'static str,
    /// Square name to highlight style
    pub highlights: BTreeMap<String, HighlightStyle>,
    pub history: Vec<HistoryEntry>,
    pub movetext: String,
    pub variations_completed: usize,
    pub total_required: usize,
    pub drill_mode: DrillMode,
    pub has_deep_variations: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DrillView {
    pub fn of(session: &DrillSession) -> Self {
        Self {
            puzzle_id: session.puzzle().id.clone(),
            title: session.puzzle().display_title(),
            phase: session.phase(),
            status: session.status().clone(),
            fen: session.position().fen(),
            orientation: match session.orientation() {
                Color::White => "white",
                Color::Black => "black",
            },
            highlights: session
                .highlights()
                .into_iter()
                .map(|(square, style)| (square.to_string(), style))
                .collect(),
            history: session.history().to_vec(),
            movetext: session.movetext(),
            variations_completed: session.variations_completed(),
            total_required: session.total_required(),
            drill_mode: session.drill_mode(),
            has_deep_variations: session.has_deep_variations(),
            error: session.error().map(str::to_string),
        }
    }
}

impl DrillSession {
    pub fn view(&self) -> DrillView {
        DrillView::of(self)
    }
}
