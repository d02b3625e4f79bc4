//! Game state and move application
//!
//! [`GameState`] couples a [`Board`] with the side to move and a cached
//! legal-move mask; every mutator re-establishes the cache invariant.
//! [`GameRecord`] is the undo stack searchers navigate.

use std::fmt;

use crate::bits::{self, BitBoard, CELL_COUNT};
use crate::board::{Board, Color, Coords, ParseError};
use crate::flip::find_flips;

/// A position with the side to move and its cached legal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameState {
    current: Color,
    board: Board,
    legal_moves: BitBoard,
}

impl GameState {
    /// The standard opening position with black to move.
    pub fn new() -> GameState {
        GameState {
            current: Color::Black,
            board: Board::START,
            legal_moves: 0x0000_1020_0408_0000,
        }
    }

    /// Builds a state from a board and side to move, computing legal moves.
    pub fn from_board_and_color(board: Board, color: Color) -> GameState {
        GameState {
            current: color,
            board,
            legal_moves: board.find_legal_moves(color),
        }
    }

    /// Parses a 65-character representation: 64 board glyphs plus the side
    /// to move.
    pub fn read(repr: &str, black: char, white: char, space: char) -> Result<GameState, ParseError> {
        let count = repr.chars().count();
        if count != CELL_COUNT + 1 {
            return Err(ParseError::Length {
                expected: CELL_COUNT + 1,
                actual: count,
            });
        }
        let split = repr
            .char_indices()
            .nth(CELL_COUNT)
            .map(|(i, _)| i)
            .unwrap_or(repr.len());
        let color_char = repr[split..].chars().next().unwrap();
        let color = if color_char == black {
            Color::Black
        } else if color_char == white {
            Color::White
        } else {
            return Err(ParseError::SideToMove(color_char));
        };
        let board = Board::read(&repr[..split], black, white, space)?;
        Ok(GameState::from_board_and_color(board, color))
    }

    /// Renders the 65-character representation.
    pub fn render(&self, black: char, white: char, space: char) -> String {
        let mut repr = self.board.render(black, white, space);
        repr.push(match self.current {
            Color::Black => black,
            Color::White => white,
        });
        repr
    }

    #[inline]
    pub fn current(&self) -> Color {
        self.current
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn legal_moves(&self) -> BitBoard {
        self.legal_moves
    }

    /// Disks of the side to move.
    #[inline]
    pub fn own_disks(&self) -> BitBoard {
        match self.current {
            Color::Black => self.board.black,
            Color::White => self.board.white,
        }
    }

    /// Disks of the side not to move.
    #[inline]
    pub fn opponent_disks(&self) -> BitBoard {
        match self.current {
            Color::Black => self.board.white,
            Color::White => self.board.black,
        }
    }

    #[inline]
    pub fn swap_colors(&mut self) {
        self.board.swap_colors();
        self.current = self.current.opponent();
    }

    /// Rewrites the position so that the side to move is black. Makes
    /// caching side-agnostic.
    #[inline]
    pub fn canonicalize(&mut self) {
        if self.current == Color::White {
            self.swap_colors();
        }
    }

    #[inline]
    pub fn canonicalized(&self) -> GameState {
        let mut res = *self;
        res.canonicalize();
        res
    }

    /// The board with the side to move as black, without touching the live
    /// state.
    #[inline]
    pub fn canonical_board(&self) -> Board {
        Board {
            black: self.own_disks(),
            white: self.opponent_disks(),
        }
    }

    pub fn mirror_main_diagonal(&mut self) {
        self.board.black = bits::mirror_main_diagonal(self.board.black);
        self.board.white = bits::mirror_main_diagonal(self.board.white);
        self.legal_moves = bits::mirror_main_diagonal(self.legal_moves);
    }

    pub fn mirror_anti_diagonal(&mut self) {
        self.board.black = bits::mirror_anti_diagonal(self.board.black);
        self.board.white = bits::mirror_anti_diagonal(self.board.white);
        self.legal_moves = bits::mirror_anti_diagonal(self.legal_moves);
    }

    pub fn rotate_180(&mut self) {
        self.board.black = bits::rotate_180(self.board.black);
        self.board.white = bits::rotate_180(self.board.white);
        self.legal_moves = bits::rotate_180(self.legal_moves);
    }

    /// Disk difference from the perspective of the side to move.
    #[inline]
    pub fn disk_difference(&self) -> i32 {
        self.current.sign() * self.board.disk_difference()
    }

    /// Whether neither side has a move left.
    pub fn is_terminal(&self) -> bool {
        self.legal_moves == 0 && self.board.find_legal_moves(self.current.opponent()) == 0
    }

    /// The final score from the perspective of the side to move, assuming
    /// the game is actually over. Empty squares count towards the winner.
    pub fn final_score(&self) -> i32 {
        debug_assert_eq!(self.legal_moves, 0);
        let diff = self.board.disk_difference();
        let empty = self.board.count_empty();
        let bonus = match diff.cmp(&0) {
            std::cmp::Ordering::Greater => empty,
            std::cmp::Ordering::Less => -empty,
            std::cmp::Ordering::Equal => 0,
        };
        self.current.sign() * (diff + bonus)
    }

    /// Applies a move for the side to move.
    ///
    /// Passing (`Coords::NONE`) requires that the side has no legal move;
    /// a square move requires that its bit is set in `legal_moves`. Both
    /// violations are programmer errors and abort.
    pub fn play(&mut self, coords: Coords) {
        if coords.is_none() {
            assert_eq!(self.legal_moves, 0, "passing with legal moves available");
            self.current = self.current.opponent();
            self.legal_moves = self.board.find_legal_moves(self.current);
            return;
        }
        assert!(
            self.legal_moves & coords.bit() != 0,
            "illegal move: {coords}"
        );
        let flips = find_flips(coords.index(), self.own_disks(), self.opponent_disks());
        match self.current {
            Color::Black => {
                self.board.black |= flips;
                self.board.white &= !flips;
            }
            Color::White => {
                self.board.white |= flips;
                self.board.black &= !flips;
            }
        }
        self.current = self.current.opponent();
        self.legal_moves = self.board.find_legal_moves(self.current);
    }

    /// Returns the successor state without mutating this one.
    #[inline]
    pub fn play_copied(&self, coords: Coords) -> GameState {
        let mut res = *self;
        res.play(coords);
        res
    }
}

impl Default for GameState {
    fn default() -> GameState {
        GameState::new()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render('X', 'O', '-'))
    }
}

/// A nonempty stack of game states supporting play/undo navigation.
#[derive(Debug, Clone)]
pub struct GameRecord {
    states: Vec<GameState>,
}

impl GameRecord {
    /// Starts a record from the standard opening.
    pub fn new() -> GameRecord {
        GameRecord::from_state(GameState::new())
    }

    /// Starts a record from an arbitrary base state.
    pub fn from_state(state: GameState) -> GameRecord {
        GameRecord {
            states: vec![state],
        }
    }

    /// Pushes the successor of the current state.
    pub fn play(&mut self, coords: Coords) {
        let next = self.current().play_copied(coords);
        self.states.push(next);
    }

    /// Pops the latest state. The base state can never be popped.
    pub fn undo(&mut self) {
        assert!(self.states.len() > 1, "cannot undo past the base state");
        self.states.pop();
    }

    /// Replaces the base state and drops everything above it.
    pub fn reset(&mut self, state: GameState) {
        self.states.clear();
        self.states.push(state);
    }

    #[inline]
    pub fn current(&self) -> &GameState {
        self.states.last().unwrap()
    }

    #[inline]
    pub fn current_canonical(&self) -> GameState {
        self.current().canonicalized()
    }

    #[inline]
    pub fn states(&self) -> &[GameState] {
        &self.states
    }
}

impl Default for GameRecord {
    fn default() -> GameRecord {
        GameRecord::new()
    }
}
