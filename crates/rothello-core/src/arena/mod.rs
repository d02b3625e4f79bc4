//! Move oracles
//!
//! The uniform player interface used by match harnesses and the self-play
//! data generator, with the two built-in implementations.

mod openings;
mod stats;

pub use openings::{load_openings, random_opening};
pub use stats::{MatchStats, PlayerRating, StatsFile};

use rand::Rng;

use crate::bits::expand_by_mask;
use crate::board::Coords;
use crate::eval::Evaluator;
use crate::game::GameState;
use crate::search::{EndgameSolver, MidgameSearcher};
use crate::tt::DEFAULT_TABLE_SIZE;

/// Plays a uniformly random legal move.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPlayer;

impl RandomPlayer {
    /// Returns [`Coords::NONE`] when there is nothing to play; otherwise
    /// lands on the i-th set bit of the legal-move mask for a uniform i.
    pub fn get_move<R: Rng + ?Sized>(&self, state: &GameState, rng: &mut R) -> Coords {
        let moves = state.legal_moves();
        if moves == 0 {
            return Coords::NONE;
        }
        let index = rng.gen_range(0..moves.count_ones());
        let mask = expand_by_mask(1 << index, moves);
        Coords::new(mask.trailing_zeros() as usize)
    }
}

/// Plays the principal move of a two-phase search: exact endgame solving
/// once few enough squares remain, heuristic midgame search before that.
pub struct SearchingPlayer {
    eval: Box<dyn Evaluator>,
    midgame_depth: i32,
    endgame_depth: i32,
    searcher: MidgameSearcher,
    solver: EndgameSolver,
}

impl SearchingPlayer {
    pub fn new(eval: Box<dyn Evaluator>, midgame_depth: i32, endgame_depth: i32) -> SearchingPlayer {
        SearchingPlayer::with_table_size(eval, midgame_depth, endgame_depth, DEFAULT_TABLE_SIZE)
    }

    /// As [`SearchingPlayer::new`], with a custom transposition-table size
    /// for both searchers.
    pub fn with_table_size(
        eval: Box<dyn Evaluator>,
        midgame_depth: i32,
        endgame_depth: i32,
        table_size: usize,
    ) -> SearchingPlayer {
        assert!(midgame_depth > 0, "midgame depth must be positive");
        assert!(endgame_depth >= 0, "endgame depth must not be negative");
        SearchingPlayer {
            eval,
            midgame_depth,
            endgame_depth,
            searcher: MidgameSearcher::with_table_size(table_size),
            solver: EndgameSolver::with_table_size(table_size),
        }
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        &*self.eval
    }

    pub fn midgame_depth(&self) -> i32 {
        self.midgame_depth
    }

    pub fn endgame_depth(&self) -> i32 {
        self.endgame_depth
    }

    pub fn get_move(&mut self, state: &GameState) -> Coords {
        if state.legal_moves() == 0 {
            return Coords::NONE;
        }
        if state.board().count_empty() <= self.endgame_depth {
            self.solver.solve(state).best_move
        } else {
            self.searcher
                .search(state, &*self.eval, self.midgame_depth)
                .best_move
        }
    }
}

/// The two built-in move oracles as one value.
pub enum Player {
    Random(RandomPlayer),
    Searching(SearchingPlayer),
}

impl Player {
    pub fn random() -> Player {
        Player::Random(RandomPlayer)
    }

    pub fn searching(eval: Box<dyn Evaluator>, midgame_depth: i32, endgame_depth: i32) -> Player {
        Player::Searching(SearchingPlayer::new(eval, midgame_depth, endgame_depth))
    }

    /// Picks a move for the side to move; [`Coords::NONE`] means pass.
    pub fn get_move<R: Rng + ?Sized>(&mut self, state: &GameState, rng: &mut R) -> Coords {
        match self {
            Player::Random(player) => player.get_move(state, rng),
            Player::Searching(player) => player.get_move(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn random_player_only_plays_legal_moves() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let player = RandomPlayer;
        let mut state = GameState::new();
        for _ in 0..30 {
            let mv = player.get_move(&state, &mut rng);
            if mv.is_none() {
                assert_eq!(state.legal_moves(), 0);
            } else {
                assert!(state.legal_moves() & mv.bit() != 0);
            }
            state.play(mv);
            if state.is_terminal() {
                break;
            }
        }
    }

    #[test]
    fn random_games_terminate_within_sixty_plies() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..20 {
            let player = RandomPlayer;
            let mut state = GameState::new();
            let mut plies = 0;
            while !state.is_terminal() {
                let mv = player.get_move(&state, &mut rng);
                state.play(mv);
                if !mv.is_none() {
                    plies += 1;
                }
            }
            assert!(plies <= 60);
            assert_eq!(
                state.board().count_total() + state.board().count_empty(),
                64
            );
        }
    }
}
