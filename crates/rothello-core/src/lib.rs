//! Bit-parallel Othello engine core
//!
//! The crate is organized leaves-first:
//!
//! - [`bits`]: 64-bit board primitives
//! - [`flip`]: compile-time flip resolution tables
//! - [`board`] / [`game`]: position representation and move application
//! - [`tt`]: score-bound transposition table
//! - [`eval`]: the evaluator seam and the learnable pattern evaluator
//! - [`search`]: exact endgame solver and heuristic midgame searcher
//! - [`arena`]: move oracles, opening lists and ladder persistence
//! - [`perft`]: move-generation certification
//! - [`protocol`]: the line protocol spoken by external frontends

pub mod arena;
pub mod bits;
pub mod board;
pub mod eval;
pub mod flip;
pub mod game;
pub mod perft;
pub mod protocol;
pub mod search;
pub mod tt;

pub use bits::{BitBoard, SetBits, CELL_COUNT};
pub use board::{Board, Color, Coords, ParseError};
pub use eval::{Dataset, DataPoint, Evaluator, LearnableEvaluator, LinearPatternEvaluator};
pub use game::{GameRecord, GameState};
pub use search::{EndgameSolver, EvalResult, MidgameSearcher, SolveResult};
pub use tt::{Bounds, TranspositionTable};
