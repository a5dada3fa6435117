//! Terminal-oriented board renderer used by the `d` protocol command.

use crate::game_state::game_state::GameState;
use crate::utils::fen_generator::piece_to_fen_char;

/// Render the board as an ASCII grid followed by the FEN and hash.
///
/// Assumes square indexing where `0 == a1`, `7 == h1`, and `63 == h8`.
pub fn render_game_state(game_state: &GameState) -> String {
    let mut out = String::new();
    out.push_str("  a b c d e f g h\n");

    for rank in (0..8u8).rev() {
        out.push(char::from(b'1' + rank));
        out.push(' ');

        for file in 0..8u8 {
            match game_state.piece_on(rank * 8 + file) {
                Some((color, piece)) => out.push(piece_to_fen_char(color, piece)),
                None => out.push('.'),
            }
            if file < 7 {
                out.push(' ');
            }
        }

        out.push(' ');
        out.push(char::from(b'1' + rank));
        out.push('\n');
    }

    out.push_str("  a b c d e f g h\n");
    out.push_str(&format!("Fen: {}\n", game_state.get_fen()));
    out.push_str(&format!("Key: {:016X}", game_state.hash()));
    out
}
