pub use shakmaty;

pub mod board;
pub mod movetext;

pub use board::{Board, BoardError};
