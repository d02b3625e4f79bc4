//! Game-tree search
//!
//! Two searchers share the same principal-variation control flow: the
//! [`EndgameSolver`] computes exact integer scores to the end of the game,
//! the [`MidgameSearcher`] computes heuristic float scores with an
//! [`crate::eval::Evaluator`] at the leaves. Each owns its transposition
//! table and never suspends; all state stays on the owning thread.

mod endgame;
mod midgame;

pub use endgame::{EndgameSolver, INT_INF};
pub use midgame::MidgameSearcher;

use smallvec::SmallVec;

use crate::bits::SetBits;
use crate::board::Coords;
use crate::game::GameState;

/// Below this depth both searchers fall back to plain alpha-beta negamax.
pub(crate) const MIN_PVS_DEPTH: i32 = 6;

/// Inline move buffer; an Othello position has at most 33 legal moves.
pub(crate) type MoveVec = SmallVec<[Coords; 34]>;

/// Outcome of scoring a position without choosing a move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalResult<S> {
    pub nodes: u64,
    pub score: S,
}

/// Outcome of a root search: the score and the principal move
/// ([`Coords::NONE`] when the side to move has to pass).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveResult<S> {
    pub nodes: u64,
    pub score: S,
    pub best_move: Coords,
}

pub(crate) fn collect_moves(mask: u64) -> MoveVec {
    SetBits(mask).map(Coords::new).collect()
}

/// Orders moves so that replies leaving the opponent the fewest options come
/// first. Singleton move sets skip the child probes.
pub(crate) fn moves_by_mobility(state: &GameState) -> MoveVec {
    let mask = state.legal_moves();
    if mask.count_ones() == 1 {
        return collect_moves(mask);
    }
    let mut weighted: SmallVec<[(Coords, u32); 34]> = SmallVec::new();
    for mv in SetBits(mask).map(Coords::new) {
        let next = state.play_copied(mv);
        weighted.push((mv, next.legal_moves().count_ones()));
    }
    weighted.sort_by_key(|&(_, mobility)| mobility);
    weighted.into_iter().map(|(mv, _)| mv).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobility_ordering_is_ascending() {
        let state = GameState::new();
        let ordered = moves_by_mobility(&state);
        assert_eq!(ordered.len(), 4);
        let mobilities: Vec<u32> = ordered
            .iter()
            .map(|&mv| state.play_copied(mv).legal_moves().count_ones())
            .collect();
        assert!(mobilities.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn singleton_skips_probing() {
        // A tiny constructed position with exactly one legal move.
        let board = crate::board::Board {
            black: 0b001,
            white: 0b010,
        };
        let state = GameState::from_board_and_color(board, crate::board::Color::Black);
        assert_eq!(state.legal_moves().count_ones(), 1);
        let ordered = moves_by_mobility(&state);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0], Coords::new(2));
    }
}
