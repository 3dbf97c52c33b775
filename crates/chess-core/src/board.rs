//! Position adapter over shakmaty.
//! Positions travel as FEN strings; moves travel as UCI identifiers (`e2e4`, `e7e8q`).

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{
    CastlingMode, Chess, Color, EnPassantMode, Move, Piece, Position, Rank, Role, Square,
};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid UCI move: {0}")]
    InvalidUci(String),

    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Illegal move {uci} in position {fen}")]
    IllegalMove { uci: String, fen: String },
}

/// A legal chess position.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pos: Chess,
}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Self, BoardError> {
        let setup: Fen = fen
            .trim()
            .parse()
            .map_err(|_| BoardError::InvalidFen(fen.to_string()))?;
        let pos = setup
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|_| BoardError::InvalidFen(fen.to_string()))?;
        Ok(Self { pos })
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }

    /// Play a UCI move and return the resulting position.
    /// The receiver is left untouched, so callers can keep it for rollback.
    pub fn apply(&self, uci: &str) -> Result<Board, BoardError> {
        let mv = self.resolve(uci)?;
        let mut pos = self.pos.clone();
        pos.play_unchecked(mv);
        Ok(Self { pos })
    }

    /// Squares the piece on `from` can legally move to. Castling is reported
    /// as the king's destination square, not the rook's.
    pub fn legal_destinations(&self, from: Square) -> Vec<Square> {
        let mut targets: Vec<Square> = self
            .pos
            .legal_moves()
            .iter()
            .filter_map(|m| match m.to_uci(CastlingMode::Standard) {
                UciMove::Normal { from: f, to, .. } if f == from => Some(to),
                _ => None,
            })
            .collect();
        // Promotions repeat the same destination once per role
        targets.sort();
        targets.dedup();
        targets
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pos.board().piece_at(square)
    }

    pub fn turn(&self) -> Color {
        self.pos.turn()
    }

    pub fn fullmove_number(&self) -> u32 {
        self.pos.fullmoves().get()
    }

    fn resolve(&self, uci: &str) -> Result<Move, BoardError> {
        let parsed: UciMove = uci
            .parse()
            .map_err(|_| BoardError::InvalidUci(uci.to_string()))?;
        parsed.to_move(&self.pos).map_err(|_| BoardError::IllegalMove {
            uci: uci.to_string(),
            fen: self.fen(),
        })
    }
}

pub fn parse_square(name: &str) -> Result<Square, BoardError> {
    name.trim()
        .parse()
        .map_err(|_| BoardError::InvalidSquare(name.to_string()))
}

/// Build a UCI move identifier from its parts.
pub fn move_id(from: Square, to: Square, promotion: Option<Role>) -> String {
    UciMove::Normal {
        from,
        to,
        promotion,
    }
    .to_string()
}

/// Source and destination squares of a UCI move identifier.
pub fn move_squares(uci: &str) -> Option<(Square, Square)> {
    match uci.parse::<UciMove>().ok()? {
        UciMove::Normal { from, to, .. } => Some((from, to)),
        _ => None,
    }
}

/// True when `piece` arriving on `to` must promote.
pub fn is_promotion_square(piece: Piece, to: Square) -> bool {
    let last_rank = match piece.color {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    };
    piece.role == Role::Pawn && to.rank() == last_rank
}

/// Parse a board-renderer piece code such as `wP` or `bq`.
pub fn parse_piece_code(code: &str) -> Option<Piece> {
    let mut chars = code.trim().chars();
    let color = match chars.next()? {
        'w' | 'W' => Color::White,
        'b' | 'B' => Color::Black,
        _ => return None,
    };
    let role = Role::from_char(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Piece { color, role })
}

/// `"w"` / `"b"` as used in FEN side-to-move and puzzle records.
pub fn parse_color(code: &str) -> Option<Color> {
    match code.trim() {
        "w" | "white" => Some(Color::White),
        "b" | "black" => Some(Color::Black),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAMIANO_FEN: &str = "rnbqkbnr/pppp2pp/5p2/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 3";

    #[test]
    fn test_fen_round_trip() {
        let board = Board::from_fen(STANDARD_START_FEN).unwrap();
        assert_eq!(board.fen(), STANDARD_START_FEN);
        assert_eq!(board.turn(), Color::White);
        assert_eq!(board.fullmove_number(), 1);
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            Board::from_fen("not a fen"),
            Err(BoardError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_apply_leaves_original_untouched() {
        let board = Board::from_fen(DAMIANO_FEN).unwrap();
        let after = board.apply("f3e5").unwrap();
        assert_eq!(board.fen(), DAMIANO_FEN);
        assert_eq!(after.turn(), Color::Black);
        assert_eq!(
            after.piece_at(parse_square("e5").unwrap()),
            Some(Piece {
                color: Color::White,
                role: Role::Knight
            })
        );
    }

    #[test]
    fn test_apply_rejects_illegal_and_malformed() {
        let board = Board::from_fen(DAMIANO_FEN).unwrap();
        assert!(matches!(
            board.apply("e1e3"),
            Err(BoardError::IllegalMove { .. })
        ));
        assert!(matches!(board.apply("zz"), Err(BoardError::InvalidUci(_))));
    }

    #[test]
    fn test_legal_destinations_for_knight() {
        let board = Board::from_fen(DAMIANO_FEN).unwrap();
        let names: Vec<String> = board
            .legal_destinations(parse_square("f3").unwrap())
            .into_iter()
            .map(|sq| sq.to_string())
            .collect();
        assert_eq!(names, vec!["g1", "d4", "h4", "e5", "g5"]);
    }

    #[test]
    fn test_castling_reports_king_destination() {
        let board =
            Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let targets = board.legal_destinations(parse_square("e1").unwrap());
        assert!(targets.contains(&parse_square("g1").unwrap()));
        assert!(targets.contains(&parse_square("c1").unwrap()));
        assert!(!targets.contains(&parse_square("h1").unwrap()));
        assert!(board.apply("e1g1").is_ok());
    }

    #[test]
    fn test_move_helpers() {
        let e7 = parse_square("e7").unwrap();
        let e8 = parse_square("e8").unwrap();
        assert_eq!(move_id(e7, e8, Some(Role::Queen)), "e7e8q");
        assert_eq!(move_id(e7, e8, None), "e7e8");
        assert_eq!(move_squares("e7e8q"), Some((e7, e8)));

        let white_pawn = parse_piece_code("wP").unwrap();
        assert!(is_promotion_square(white_pawn, e8));
        assert!(!is_promotion_square(white_pawn, e7));
        let black_pawn = parse_piece_code("bp").unwrap();
        assert!(is_promotion_square(black_pawn, parse_square("a1").unwrap()));
        assert!(parse_piece_code("xK").is_none());
        assert!(parse_square("i9").is_err());
    }
}
