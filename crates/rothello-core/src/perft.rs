//! Move-generation certification
//!
//! Counts the leaves of the game tree at a fixed depth. A pass does not
//! consume depth; a finished game counts as a single leaf. The counts from
//! the standard opening are well known, so any divergence pins a bug in
//! move generation or move application.
//!
//! Reference values for depths 0..15:
//! 1, 4, 12, 56, 244, 1396, 8200, 55092, 390216, 3005320, 24571420,
//! 212260880, 1939899208, 18429791868, 184043158384, 1891845643044.

use crate::board::Coords;
use crate::game::GameState;

/// Counts depth-`depth` leaves below `state`.
pub fn perft_from(state: &GameState, depth: i32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut state = *state;
    if state.legal_moves() == 0 {
        state.play(Coords::NONE);
        if state.legal_moves() == 0 {
            return 1;
        }
    }
    let mut result = 0;
    for mv in crate::bits::SetBits(state.legal_moves()).map(Coords::new) {
        result += perft_from(&state.play_copied(mv), depth - 1);
    }
    result
}

/// Counts depth-`depth` leaves from the standard opening.
pub fn perft(depth: i32) -> u64 {
    perft_from(&GameState::new(), depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallow_counts_match_reference() {
        let expected = [4u64, 12, 56, 244, 1396, 8200, 55092, 390216];
        for (i, &count) in expected.iter().enumerate() {
            assert_eq!(perft(i as i32 + 1), count, "depth {}", i + 1);
        }
    }

    #[test]
    fn depth_nine_matches_reference() {
        assert_eq!(perft(9), 3_005_320);
    }

    #[test]
    fn terminal_positions_count_once() {
        let board = crate::board::Board {
            black: 0x0303,
            white: 0xc0c0_0000_0000_0000,
        };
        let state = GameState::from_board_and_color(board, crate::board::Color::Black);
        assert!(state.is_terminal());
        assert_eq!(perft_from(&state, 5), 1);
    }
}
