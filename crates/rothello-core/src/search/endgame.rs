//! Exact endgame solver
//!
//! Searches all the way to the end of the game; the depth parameter always
//! equals the number of empty squares. Shallow subtrees run plain negamax
//! with a dedicated two-ply leaf; deeper ones run principal-variation search
//! with null windows, mobility ordering and transposition-table bounds.

use crate::bits::CELL_COUNT;
use crate::board::{Board, Coords};
use crate::flip::count_flips;
use crate::game::GameState;
use crate::tt::{Bounds, TranspositionTable, DEFAULT_TABLE_SIZE};

use super::{collect_moves, moves_by_mobility, EvalResult, SolveResult, MIN_PVS_DEPTH};

/// One more than the largest representable score; used as the open window
/// bound.
pub const INT_INF: i32 = CELL_COUNT as i32 + 1;

/// Exact negamax/PVS solver for positions near the end of the game.
pub struct EndgameSolver {
    nodes: u64,
    tt: TranspositionTable<i32>,
}

impl EndgameSolver {
    pub fn new() -> EndgameSolver {
        EndgameSolver::with_table_size(DEFAULT_TABLE_SIZE)
    }

    /// Creates a solver whose table has `size` slots (a power of two).
    pub fn with_table_size(size: usize) -> EndgameSolver {
        EndgameSolver {
            nodes: 0,
            tt: TranspositionTable::with_size(size),
        }
    }

    /// The table of score bounds accumulated by past solves. Entries are
    /// keyed by canonical board, so they stay valid across calls.
    pub fn transposition_table(&self) -> &TranspositionTable<i32> {
        &self.tt
    }

    pub fn clear_transposition_table(&mut self) {
        self.tt.clear();
    }

    /// Exact score of `state` from the mover's perspective.
    pub fn evaluate(&mut self, state: &GameState) -> EvalResult<i32> {
        self.nodes = 0;
        let depth = state.board().count_empty();
        let score = self.negascout(*state, -INT_INF, INT_INF, depth, false);
        EvalResult {
            nodes: self.nodes,
            score,
        }
    }

    /// Exact score plus the best move; the move is [`Coords::NONE`] when the
    /// mover has to pass.
    pub fn solve(&mut self, state: &GameState) -> SolveResult<i32> {
        self.nodes = 0;
        let depth = state.board().count_empty();
        if state.legal_moves() == 0 {
            let passed = state.play_copied(Coords::NONE);
            let score = -self.negascout(passed, -INT_INF, INT_INF, depth, true);
            return SolveResult {
                nodes: self.nodes,
                score,
                best_move: Coords::NONE,
            };
        }
        let mut res = SolveResult {
            nodes: 0,
            score: -INT_INF,
            best_move: Coords::NONE,
        };
        for mv in collect_moves(state.legal_moves()) {
            let score = -self.negascout(state.play_copied(mv), -INT_INF, -res.score, depth - 1, false);
            if score > res.score {
                res.score = score;
                res.best_move = mv;
            }
        }
        res.nodes = self.nodes;
        res
    }

    fn negamax(&mut self, state: GameState, mut alpha: i32, beta: i32, depth: i32, passed: bool) -> i32 {
        match depth {
            0 => {
                self.nodes += 1;
                return state.disk_difference();
            }
            1 => return self.negamax_last(state, passed),
            _ => {}
        }
        self.nodes += 1;
        let moves = state.legal_moves();
        if moves == 0 {
            if passed {
                return state.final_score();
            }
            return -self.negamax(state.play_copied(Coords::NONE), -beta, -alpha, depth, true);
        }
        for mv in collect_moves(moves) {
            let score = -self.negamax(state.play_copied(mv), -beta, -alpha, depth - 1, false);
            if score > alpha {
                if score >= beta {
                    return score;
                }
                alpha = score;
            }
        }
        alpha
    }

    // Single empty square left: score the only possible move straight from
    // the flip count instead of materializing the child.
    fn negamax_last(&mut self, state: GameState, passed: bool) -> i32 {
        self.nodes += 1;
        let moves = state.legal_moves();
        if moves == 0 {
            if passed {
                return state.final_score();
            }
            return -self.negamax_last(state.play_copied(Coords::NONE), true);
        }
        let board = state.canonical_board();
        let flips = count_flips(moves.trailing_zeros() as usize, board.black, board.white);
        board.disk_difference() + 1 + 2 * flips
    }

    fn negascout(&mut self, mut state: GameState, mut alpha: i32, mut beta: i32, depth: i32, passed: bool) -> i32 {
        if depth < MIN_PVS_DEPTH {
            return self.negamax(state, alpha, beta, depth, passed);
        }
        self.nodes += 1;
        state.canonicalize();
        let lookahead = state.current().index() as u32;
        let board = *state.board();
        let mut bounds = Bounds {
            lower: -INT_INF,
            upper: INT_INF,
        };
        if let Some(cached) = self.tt.try_load(&board, lookahead) {
            bounds = cached;
            if bounds.upper <= alpha {
                return bounds.upper;
            }
            if bounds.lower >= beta {
                return bounds.lower;
            }
            if bounds.lower == bounds.upper {
                return bounds.lower;
            }
            alpha = alpha.max(bounds.lower);
            beta = beta.min(bounds.upper);
        }
        let moves = state.legal_moves();
        if moves == 0 {
            if passed {
                let score = state.final_score();
                self.tt.store(board, lookahead, Bounds::exact(score));
                return score;
            }
            let score = -self.negascout(state.play_copied(Coords::NONE), -beta, -alpha, depth, true);
            self.store_bounds(board, lookahead, bounds, score, alpha, beta);
            return score;
        }
        let mut score = -INT_INF;
        for mv in moves_by_mobility(&state) {
            let next = state.play_copied(mv);
            let lower = alpha.max(score);
            let new_score = if lower == -INT_INF {
                -self.negascout(next, -beta, INT_INF, depth - 1, false)
            } else {
                // Null-window probe, re-searched on a fail-high inside the
                // window.
                let probed = -self.negascout(next, -lower - 1, -lower, depth - 1, false);
                if lower < probed && probed < beta {
                    -self.negascout(next, -beta, -lower, depth - 1, false)
                } else {
                    probed
                }
            };
            if new_score > score {
                score = new_score;
                if score >= beta {
                    break;
                }
            }
        }
        self.store_bounds(board, lookahead, bounds, score, alpha, beta);
        score
    }

    fn store_bounds(
        &mut self,
        board: Board,
        lookahead: u32,
        bounds: Bounds<i32>,
        score: i32,
        alpha: i32,
        beta: i32,
    ) {
        let stored = if score <= alpha {
            Bounds {
                lower: bounds.lower,
                upper: score,
            }
        } else if score >= beta {
            Bounds {
                lower: score,
                upper: bounds.upper,
            }
        } else {
            Bounds::exact(score)
        };
        self.tt.store(board, lookahead, stored);
    }
}

impl Default for EndgameSolver {
    fn default() -> EndgameSolver {
        EndgameSolver::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::SetBits;
    use crate::board::{Board, Color};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    // Straightforward exhaustive negamax, no windows, no tables.
    fn reference_score(state: &GameState, passed: bool) -> i32 {
        if state.legal_moves() == 0 {
            if passed {
                return state.final_score();
            }
            return -reference_score(&state.play_copied(Coords::NONE), true);
        }
        let mut best = -INT_INF;
        for mv in SetBits(state.legal_moves()).map(Coords::new) {
            best = best.max(-reference_score(&state.play_copied(mv), false));
        }
        best
    }

    fn random_position_with_empties(rng: &mut ChaCha8Rng, empties: i32) -> GameState {
        loop {
            let mut state = GameState::new();
            loop {
                if state.board().count_empty() <= empties {
                    return state;
                }
                if state.legal_moves() == 0 {
                    state.play(Coords::NONE);
                    if state.legal_moves() == 0 {
                        break; // Finished early, try another playout.
                    }
                    continue;
                }
                let moves: Vec<usize> = SetBits(state.legal_moves()).collect();
                state.play(Coords::new(moves[rng.gen_range(0..moves.len())]));
            }
        }
    }

    #[test]
    fn matches_exhaustive_reference() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut solver = EndgameSolver::with_table_size(1 << 14);
        for empties in [4, 6, 8] {
            for _ in 0..5 {
                let state = random_position_with_empties(&mut rng, empties);
                let expected = reference_score(&state, false);
                assert_eq!(solver.evaluate(&state).score, expected);
            }
        }
    }

    #[test]
    fn solve_and_evaluate_agree() {
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        let mut solver = EndgameSolver::with_table_size(1 << 14);
        for _ in 0..10 {
            let state = random_position_with_empties(&mut rng, 9);
            let solved = solver.solve(&state);
            let evaluated = solver.evaluate(&state);
            assert_eq!(solved.score, evaluated.score);
            if solved.best_move.is_none() {
                assert_eq!(state.legal_moves(), 0);
            } else {
                assert!(state.legal_moves() & solved.best_move.bit() != 0);
            }
        }
    }

    #[test]
    fn double_pass_scores_the_final_position() {
        // Black owns a corner block, white the opposite corner, nothing can
        // move: the game is over where it stands.
        let board = Board {
            black: 0x0303,
            white: 0xc0c0_0000_0000_0000,
        };
        let state = GameState::from_board_and_color(board, Color::Black);
        assert_eq!(state.legal_moves(), 0);
        assert!(state.is_terminal());
        let mut solver = EndgameSolver::with_table_size(1 << 12);
        let res = solver.solve(&state);
        assert_eq!(res.best_move, Coords::NONE);
        assert_eq!(res.score, state.final_score());
        assert_eq!(res.score, 0); // 4 vs 4 disks, empties split nowhere.
    }

    #[test]
    fn warm_table_does_not_change_scores() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let mut fresh = EndgameSolver::with_table_size(1 << 14);
        let mut warm = EndgameSolver::with_table_size(1 << 14);
        let positions: Vec<GameState> = (0..6)
            .map(|_| random_position_with_empties(&mut rng, 10))
            .collect();
        // Warm the second solver on all the positions first.
        for state in &positions {
            let _ = warm.solve(state);
        }
        for state in &positions {
            assert_eq!(fresh.solve(state).score, warm.solve(state).score);
        }
    }

    #[test]
    fn node_counter_resets_per_call() {
        let mut rng = ChaCha8Rng::seed_from_u64(37);
        let state = random_position_with_empties(&mut rng, 6);
        let mut solver = EndgameSolver::with_table_size(1 << 12);
        let first = solver.evaluate(&state);
        let second = solver.evaluate(&state);
        assert!(first.nodes > 0);
        // The table remembers the first pass, so the second is no larger.
        assert!(second.nodes <= first.nodes);
    }
}
