//! FEN-to-GameState parser.
//!
//! Builds a fully-populated position from a Forsyth-Edwards Notation string:
//! piece and side bitboards, the seed state word (side, castling, en passant,
//! king squares, halfmove clock) and the fullmove counter. The trailing clock
//! fields may be omitted and default to `0 1`.

use std::sync::Arc;

use crate::errors::{EngineError, EngineResult};
use crate::game_state::state_word::StateWord;
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::search::zobrist::ZobristKeys;
use crate::utils::algebraic::algebraic_to_square;

pub fn parse_fen(fen: &str, keys: Arc<ZobristKeys>) -> EngineResult<GameState> {
    let mut parts = fen.split_whitespace();

    let board_part = parts.next().ok_or_else(|| invalid("missing board layout"))?;
    let side_part = parts.next().ok_or_else(|| invalid("missing side to move"))?;
    let castling_part = parts.next().ok_or_else(|| invalid("missing castling rights"))?;
    let en_passant_part = parts.next().ok_or_else(|| invalid("missing en-passant square"))?;
    let halfmove_part = parts.next().unwrap_or("0");
    let fullmove_part = parts.next().unwrap_or("1");

    if parts.next().is_some() {
        return Err(invalid("extra trailing fields"));
    }

    let mut pieces = [0u64; 6];
    let mut sides = [0u64; 2];
    parse_board(board_part, &mut pieces, &mut sides)?;

    let side_to_move = parse_side_to_move(side_part)?;
    let mut state = StateWord::default();
    state.set_side_to_move(side_to_move);
    state.set_castling_rights(parse_castling_rights(castling_part)?);
    if let Some(file) = parse_en_passant_file(en_passant_part, side_to_move)? {
        state.set_en_passant_file(file);
    }

    for color in [Color::Light, Color::Dark] {
        let kings = pieces[PieceKind::King.index()] & sides[color.index()];
        if kings.count_ones() != 1 {
            return Err(invalid(&format!("{color:?} must have exactly one king")));
        }
        state.set_king_square(color, kings.trailing_zeros() as Square);
    }

    let halfmove_clock = halfmove_part
        .parse::<u32>()
        .map_err(|_| invalid(&format!("bad halfmove clock '{halfmove_part}'")))?;
    state.set_halfmove_clock(halfmove_clock);
    let fullmove_number = fullmove_part
        .parse::<u16>()
        .map_err(|_| invalid(&format!("bad fullmove number '{fullmove_part}'")))?;

    Ok(GameState::from_parts(pieces, sides, state, fullmove_number, keys))
}

fn invalid(reason: &str) -> EngineError {
    EngineError::InvalidFen(reason.to_owned())
}

fn parse_board(board_part: &str, pieces: &mut [u64; 6], sides: &mut [u64; 2]) -> EngineResult<()> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err(invalid("board layout must contain 8 ranks"));
    }

    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let board_rank = 7 - fen_rank_idx;
        let mut file = 0usize;

        for ch in rank_str.chars() {
            if let Some(empty_count) = ch.to_digit(10) {
                if !(1..=8).contains(&empty_count) {
                    return Err(invalid(&format!("bad empty-square count '{ch}'")));
                }
                file += empty_count as usize;
                continue;
            }

            let (color, piece) = piece_from_fen_char(ch)
                .ok_or_else(|| invalid(&format!("bad piece character '{ch}'")))?;
            if file >= 8 {
                return Err(invalid("rank has too many files"));
            }

            let bit = 1u64 << (board_rank * 8 + file);
            pieces[piece.index()] |= bit;
            sides[color.index()] |= bit;
            file += 1;
        }

        if file != 8 {
            return Err(invalid(&format!("rank '{rank_str}' does not span 8 files")));
        }
    }

    Ok(())
}

fn parse_side_to_move(side_part: &str) -> EngineResult<Color> {
    match side_part {
        "w" => Ok(Color::Light),
        "b" => Ok(Color::Dark),
        _ => Err(invalid(&format!("bad side to move '{side_part}'"))),
    }
}

fn parse_castling_rights(castling_part: &str) -> EngineResult<CastlingRights> {
    if castling_part == "-" {
        return Ok(0);
    }

    let mut rights: CastlingRights = 0;
    for ch in castling_part.chars() {
        match ch {
            'K' => rights |= CASTLE_LIGHT_KINGSIDE,
            'Q' => rights |= CASTLE_LIGHT_QUEENSIDE,
            'k' => rights |= CASTLE_DARK_KINGSIDE,
            'q' => rights |= CASTLE_DARK_QUEENSIDE,
            _ => return Err(invalid(&format!("bad castling character '{ch}'"))),
        }
    }
    Ok(rights)
}

/// The en-passant target must sit on the rank just behind a pawn the opponent double-pushed.
fn parse_en_passant_file(en_passant_part: &str, side_to_move: Color) -> EngineResult<Option<u8>> {
    if en_passant_part == "-" {
        return Ok(None);
    }

    let square = algebraic_to_square(en_passant_part)
        .map_err(|_| invalid(&format!("bad en-passant square '{en_passant_part}'")))?;
    let expected_rank = match side_to_move {
        Color::Light => 5,
        Color::Dark => 2,
    };
    if rank_of(square) != expected_rank {
        return Err(invalid(&format!(
            "en-passant square '{en_passant_part}' is on the wrong rank"
        )));
    }
    Ok(Some(file_of(square)))
}

fn piece_from_fen_char(ch: char) -> Option<(Color, PieceKind)> {
    let color = if ch.is_ascii_uppercase() {
        Color::Light
    } else if ch.is_ascii_lowercase() {
        Color::Dark
    } else {
        return None;
    };

    let piece = match ch.to_ascii_lowercase() {
        'p' => PieceKind::Pawn,
        'n' => PieceKind::Knight,
        'b' => PieceKind::Bishop,
        'r' => PieceKind::Rook,
        'q' => PieceKind::Queen,
        'k' => PieceKind::King,
        _ => return None,
    };

    Some((color, piece))
}
