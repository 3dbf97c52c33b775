pub use chess_core;

pub mod arbiter;
pub mod board_view;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod driver;
pub mod error;
pub mod opponent;
pub mod puzzle;
pub mod session;
pub mod status;
pub mod variations;
pub mod view;

pub use catalog::{Catalog, FileCatalog, HttpCatalog};
pub use config::{DrillTimings, TrainerConfig};
pub use driver::DrillDriver;
pub use error::TrainerError;
pub use opponent::DrillMode;
pub use puzzle::{Puzzle, PuzzleGroup, PuzzleRecord, PuzzleSet};
pub use session::{DrillSession, HistoryEntry, MoveOrigin, Phase, Scheduled, Step, Ticket};
pub use view::DrillView;
