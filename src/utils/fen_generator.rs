use crate::game_state::{chess_types::*, game_state::GameState};
use crate::utils::algebraic::square_to_algebraic;

pub fn generate_fen(game_state: &GameState) -> String {
    let side_to_move = match game_state.side_to_move() {
        Color::Light => "w",
        Color::Dark => "b",
    };

    format!(
        "{} {} {} {} {} {}",
        generate_board_field(game_state),
        side_to_move,
        generate_castling_field(game_state.castling_rights()),
        generate_en_passant_field(game_state.en_passant_square()),
        game_state.halfmove_clock(),
        game_state.fullmove_number()
    )
}

fn generate_board_field(game_state: &GameState) -> String {
    let mut out = String::new();

    for rank in (0..8u8).rev() {
        let mut empty_count = 0u8;

        for file in 0..8u8 {
            match game_state.piece_on(rank * 8 + file) {
                Some((color, piece)) => {
                    if empty_count > 0 {
                        out.push(char::from(b'0' + empty_count));
                        empty_count = 0;
                    }
                    out.push(piece_to_fen_char(color, piece));
                }
                None => empty_count += 1,
            }
        }

        if empty_count > 0 {
            out.push(char::from(b'0' + empty_count));
        }
        if rank > 0 {
            out.push('/');
        }
    }

    out
}

pub fn piece_to_fen_char(color: Color, piece: PieceKind) -> char {
    let base = match piece {
        PieceKind::Pawn => 'p',
        PieceKind::Knight => 'n',
        PieceKind::Bishop => 'b',
        PieceKind::Rook => 'r',
        PieceKind::Queen => 'q',
        PieceKind::King => 'k',
    };

    match color {
        Color::Light => base.to_ascii_uppercase(),
        Color::Dark => base,
    }
}

fn generate_castling_field(rights: CastlingRights) -> String {
    let mut out = String::new();

    if (rights & CASTLE_LIGHT_KINGSIDE) != 0 {
        out.push('K');
    }
    if (rights & CASTLE_LIGHT_QUEENSIDE) != 0 {
        out.push('Q');
    }
    if (rights & CASTLE_DARK_KINGSIDE) != 0 {
        out.push('k');
    }
    if (rights & CASTLE_DARK_QUEENSIDE) != 0 {
        out.push('q');
    }

    if out.is_empty() {
        out.push('-');
    }
    out
}

fn generate_en_passant_field(square: Option<Square>) -> String {
    square
        .and_then(|sq| square_to_algebraic(sq).ok())
        .unwrap_or_else(|| "-".to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::generate_fen;
    use crate::game_state::game_state::GameState;
    use crate::moves::chess_move::{Move, FLAG_DOUBLE_PAWN_PUSH};
    use crate::search::zobrist::ZobristKeys;
    use crate::utils::fen_parser::parse_fen;

    #[test]
    fn custom_position_round_trips() {
        let keys = Arc::new(ZobristKeys::new());
        let fen = "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/2N2N2/PPPP1PPP/R1BQ1RK1 b kq - 4 6";
        let parsed = parse_fen(fen, Arc::clone(&keys)).expect("custom FEN should parse");
        let generated = generate_fen(&parsed);
        assert_eq!(generated, fen);

        let reparsed = parse_fen(&generated, keys).expect("generated FEN should parse");
        assert_eq!(reparsed, parsed);
        assert_eq!(reparsed.hash(), parsed.hash());
    }

    #[test]
    fn played_moves_advance_counters_and_en_passant() {
        let mut game = GameState::new_game(Arc::new(ZobristKeys::new()));
        game.make_move(Move::new(12, 28, FLAG_DOUBLE_PAWN_PUSH))
            .expect("e2e4 should apply");
        assert_eq!(
            generate_fen(&game),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        game.make_move(Move::new(52, 36, FLAG_DOUBLE_PAWN_PUSH))
            .expect("e7e5 should apply");
        assert_eq!(
            generate_fen(&game),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2"
        );
    }
}
