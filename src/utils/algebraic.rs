//! Square conversions for coordinate notation (`e4` <-> 28).

use crate::errors::{EngineError, EngineResult};
use crate::game_state::chess_types::Square;

/// Parse a coordinate such as `e4` into a square index.
#[inline]
pub fn algebraic_to_square(square: &str) -> EngineResult<Square> {
    let bytes = square.as_bytes();
    if bytes.len() != 2 {
        return Err(EngineError::InvalidSquare(square.to_owned()));
    }

    let file = bytes[0];
    let rank = bytes[1];
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return Err(EngineError::InvalidSquare(square.to_owned()));
    }

    Ok((rank - b'1') * 8 + (file - b'a'))
}

#[inline]
pub fn square_to_algebraic(square: Square) -> EngineResult<String> {
    if square > 63 {
        return Err(EngineError::InvalidSquare(square.to_string()));
    }

    let file_char = char::from(b'a' + square % 8);
    let rank_char = char::from(b'1' + square / 8);
    Ok(format!("{file_char}{rank_char}"))
}
