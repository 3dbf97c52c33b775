//! Numbered movetext for a run of SAN moves.

use shakmaty::Color;

/// Format SAN moves as numbered movetext, starting at `fullmove` with `turn` to move.
/// e.g. (3, Black, ["f6", "Nxe5", "fxe5"]) → "3...f6 4. Nxe5 fxe5"
pub fn format_movetext<S: AsRef<str>>(fullmove: u32, turn: Color, sans: &[S]) -> String {
    let mut formatted = String::new();
    let mut number = fullmove.max(1);
    let mut side = turn;

    for (i, san) in sans.iter().enumerate() {
        let san = san.as_ref();
        match side {
            Color::White => {
                if !formatted.is_empty() {
                    formatted.push(' ');
                }
                formatted.push_str(&format!("{}. {}", number, san));
            }
            Color::Black if i == 0 => formatted.push_str(&format!("{}...{}", number, san)),
            Color::Black => formatted.push_str(&format!(" {}", san)),
        }

        if side == Color::Black {
            number += 1;
        }
        side = !side;
    }

    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_white() {
        let line = format_movetext(1, Color::White, &["e4", "e5", "Nf3", "f6"]);
        assert_eq!(line, "1. e4 e5 2. Nf3 f6");
    }

    #[test]
    fn test_from_black() {
        let line = format_movetext(3, Color::Black, &["f6", "Nxe5", "fxe5", "Qh5+"]);
        assert_eq!(line, "3...f6 4. Nxe5 fxe5 5. Qh5+");
    }

    #[test]
    fn test_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(format_movetext(7, Color::White, &empty), "");
    }
}
