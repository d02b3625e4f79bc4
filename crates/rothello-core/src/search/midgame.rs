//! Heuristic midgame searcher
//!
//! The same principal-variation control flow as the endgame solver, over
//! float scores with an evaluator at the leaves. Because leaf values are
//! heuristic, the table is keyed by remaining depth and cleared per search,
//! and deep nodes order moves with a half-depth probe search instead of raw
//! mobility.

use crate::board::{Board, Coords};
use crate::eval::Evaluator;
use crate::game::{GameRecord, GameState};
use crate::tt::{Bounds, TranspositionTable, DEFAULT_TABLE_SIZE};

use super::{collect_moves, moves_by_mobility, EvalResult, MoveVec, SolveResult, MIN_PVS_DEPTH};

/// At this depth and above, candidate moves are ordered by a half-depth
/// search instead of opponent mobility.
const MIN_SHALLOW_DEPTH: i32 = 10;

/// Depth-limited PVS with heuristic leaf evaluation.
pub struct MidgameSearcher {
    nodes: u64,
    record: GameRecord,
    scratch: GameRecord,
    tt: TranspositionTable<f32>,
}

impl MidgameSearcher {
    pub fn new() -> MidgameSearcher {
        MidgameSearcher::with_table_size(DEFAULT_TABLE_SIZE)
    }

    /// Creates a searcher whose table has `size` slots (a power of two).
    pub fn with_table_size(size: usize) -> MidgameSearcher {
        MidgameSearcher {
            nodes: 0,
            record: GameRecord::new(),
            scratch: GameRecord::new(),
            tt: TranspositionTable::with_size(size),
        }
    }

    /// The score bounds accumulated by the last search. The table is
    /// cleared at the start of every search, so this holds exactly the
    /// entries of the most recent one.
    pub fn transposition_table(&self) -> &TranspositionTable<f32> {
        &self.tt
    }

    /// Scores `state` by a depth-limited search with `eval` at the leaves.
    pub fn evaluate(&mut self, state: &GameState, eval: &dyn Evaluator, depth: i32) -> EvalResult<f32> {
        self.nodes = 0;
        self.record.reset(*state);
        self.tt.clear();
        let score = self.negascout(eval, f32::NEG_INFINITY, f32::INFINITY, depth, false);
        EvalResult {
            nodes: self.nodes,
            score,
        }
    }

    /// Scores `state` and tracks the principal move at the root; passes
    /// (and negates) when the mover has no legal move.
    pub fn search(&mut self, state: &GameState, eval: &dyn Evaluator, depth: i32) -> SolveResult<f32> {
        self.nodes = 0;
        self.record.reset(*state);
        self.tt.clear();
        if state.legal_moves() == 0 {
            self.record.play(Coords::NONE);
            let score = -self.negascout(eval, f32::NEG_INFINITY, f32::INFINITY, depth, false);
            return SolveResult {
                nodes: self.nodes,
                score,
                best_move: Coords::NONE,
            };
        }
        let mut res = SolveResult {
            nodes: 0,
            score: f32::NEG_INFINITY,
            best_move: Coords::NONE,
        };
        for mv in collect_moves(state.legal_moves()) {
            self.record.play(mv);
            let score = -self.negascout(eval, f32::NEG_INFINITY, -res.score, depth - 1, false);
            self.record.undo();
            if score > res.score {
                res.score = score;
                res.best_move = mv;
            }
        }
        res.nodes = self.nodes;
        res
    }

    fn negamax(&mut self, eval: &dyn Evaluator, mut alpha: f32, beta: f32, depth: i32, passed: bool) -> f32 {
        self.nodes += 1;
        let state = self.record.current_canonical();
        if depth == 0 {
            return eval.evaluate(state.board());
        }
        let moves = state.legal_moves();
        if moves == 0 {
            if passed {
                return state.final_score() as f32;
            }
            self.record.play(Coords::NONE);
            let score = -self.negamax(eval, -beta, -alpha, depth, true);
            self.record.undo();
            return score;
        }
        for mv in collect_moves(moves) {
            self.record.play(mv);
            let score = -self.negamax(eval, -beta, -alpha, depth - 1, false);
            self.record.undo();
            if score > alpha {
                if score >= beta {
                    return score;
                }
                alpha = score;
            }
        }
        alpha
    }

    fn negascout(&mut self, eval: &dyn Evaluator, mut alpha: f32, mut beta: f32, depth: i32, passed: bool) -> f32 {
        if depth < MIN_PVS_DEPTH {
            return self.negamax(eval, alpha, beta, depth, passed);
        }
        self.nodes += 1;
        let state = self.record.current_canonical();
        let board = *state.board();
        let mut bounds = Bounds {
            lower: f32::NEG_INFINITY,
            upper: f32::INFINITY,
        };
        if let Some(cached) = self.tt.try_load(&board, depth as u32) {
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
                let score = state.final_score() as f32;
                self.tt.store(board, depth as u32, Bounds::exact(score));
                return score;
            }
            self.record.play(Coords::NONE);
            let score = -self.negascout(eval, -beta, -alpha, depth, true);
            self.record.undo();
            self.store_bounds(board, depth, bounds, score, alpha, beta);
            return score;
        }
        let ordered = if depth >= MIN_SHALLOW_DEPTH {
            self.order_by_shallow_search(eval, &state, depth)
        } else {
            moves_by_mobility(&state)
        };
        let mut score = f32::NEG_INFINITY;
        for mv in ordered {
            self.record.play(mv);
            let lower = alpha.max(score);
            let new_score = if lower == f32::NEG_INFINITY {
                -self.negascout(eval, -beta, f32::INFINITY, depth - 1, false)
            } else {
                // Null-window probe with an open upper bound just above the
                // best score so far; re-search on a fail-high inside the
                // window.
                let probed = -self.negascout(eval, -lower.next_up(), -lower, depth - 1, false);
                if lower < probed && probed < beta {
                    -self.negascout(eval, -beta, -lower, depth - 1, false)
                } else {
                    probed
                }
            };
            self.record.undo();
            if new_score > score {
                score = new_score;
                if score >= beta {
                    break;
                }
            }
        }
        self.store_bounds(board, depth, bounds, score, alpha, beta);
        score
    }

    // Probes every candidate with a half-depth search on a swapped-in
    // secondary record and sorts best-first.
    fn order_by_shallow_search(&mut self, eval: &dyn Evaluator, state: &GameState, depth: i32) -> MoveVec {
        let root = *self.record.current();
        std::mem::swap(&mut self.record, &mut self.scratch);
        self.record.reset(root);
        let mut weighted: smallvec::SmallVec<[(Coords, f32); 34]> = smallvec::SmallVec::new();
        for mv in collect_moves(state.legal_moves()) {
            self.record.play(mv);
            let score = -self.negascout(eval, f32::NEG_INFINITY, f32::INFINITY, depth / 2, false);
            self.record.undo();
            weighted.push((mv, score));
        }
        std::mem::swap(&mut self.record, &mut self.scratch);
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
        weighted.into_iter().map(|(mv, _)| mv).collect()
    }

    fn store_bounds(&mut self, board: Board, depth: i32, bounds: Bounds<f32>, score: f32, alpha: f32, beta: f32) {
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
        self.tt.store(board, depth as u32, stored);
    }
}

impl Default for MidgameSearcher {
    fn default() -> MidgameSearcher {
        MidgameSearcher::new()
    }
}
