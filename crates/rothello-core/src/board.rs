//! Board representation
//!
//! `Color`, `Coords` and the two-bitboard `Board` with legal-move
//! generation. The board layout is row-major with a1 at bit 0 and the file
//! increasing with the low bits.

use std::fmt;
use std::str::FromStr;

use crate::bits::{BitBoard, CENTER_6X6, CELL_COUNT, MIDDLE_6_FILES};

/// Side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    White = 1,
}

impl Color {
    /// Returns the other side.
    #[inline]
    pub const fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Score sign from this side's perspective: +1 for black, -1 for white.
    #[inline]
    pub const fn sign(self) -> i32 {
        match self {
            Color::Black => 1,
            Color::White => -1,
        }
    }

    /// Index for array access.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::ops::Not for Color {
    type Output = Color;

    #[inline]
    fn not(self) -> Color {
        self.opponent()
    }
}

/// Errors from parsing coordinates, boards or game states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The representation has the wrong number of characters.
    Length { expected: usize, actual: usize },
    /// A character matched none of the expected glyphs.
    Glyph(char),
    /// A two-character coordinate is malformed.
    Coords(String),
    /// The trailing side-to-move glyph is invalid.
    SideToMove(char),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Length { expected, actual } => {
                write!(f, "Expected {expected} characters, got {actual}")
            }
            ParseError::Glyph(c) => write!(f, "Unexpected glyph: {c:?}"),
            ParseError::Coords(s) => write!(f, "Invalid coordinates: {s:?}"),
            ParseError::SideToMove(c) => write!(f, "Invalid side to move: {c:?}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A square on the board, or the pass sentinel [`Coords::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coords(u8);

impl Coords {
    /// The pass sentinel, distinct from every square.
    pub const NONE: Coords = Coords(CELL_COUNT as u8);

    /// Creates a coordinate from a square index in `0..64`.
    #[inline]
    pub fn new(index: usize) -> Coords {
        assert!(index < CELL_COUNT, "square index out of range: {index}");
        Coords(index as u8)
    }

    /// Creates a coordinate from zero-based file and rank.
    #[inline]
    pub fn from_file_rank(file: usize, rank: usize) -> Coords {
        assert!(file < 8 && rank < 8);
        Coords((rank * 8 + file) as u8)
    }

    /// Square index. Must not be called on the pass sentinel.
    #[inline]
    pub fn index(self) -> usize {
        debug_assert!(!self.is_none());
        self.0 as usize
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 as usize == CELL_COUNT
    }

    /// Zero-based file (a = 0).
    #[inline]
    pub fn file(self) -> usize {
        self.index() % 8
    }

    /// Zero-based rank (1 = 0).
    #[inline]
    pub fn rank(self) -> usize {
        self.index() / 8
    }

    /// The single-bit mask of this square. Must not be the pass sentinel.
    #[inline]
    pub fn bit(self) -> BitBoard {
        assert!(!self.is_none(), "the pass sentinel has no bitboard");
        1u64 << self.0
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("Pass");
        }
        let file = (b'A' + self.file() as u8) as char;
        let rank = (b'1' + self.rank() as u8) as char;
        write!(f, "{file}{rank}")
    }
}

impl FromStr for Coords {
    type Err = ParseError;

    /// Parses a two-character coordinate such as `e6` or `E6`.
    fn from_str(s: &str) -> Result<Coords, ParseError> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ParseError::Coords(s.to_string()));
        }
        let file = match bytes[0] {
            b'a'..=b'h' => bytes[0] - b'a',
            b'A'..=b'H' => bytes[0] - b'A',
            _ => return Err(ParseError::Coords(s.to_string())),
        };
        let rank = match bytes[1] {
            b'1'..=b'8' => bytes[1] - b'1',
            _ => return Err(ParseError::Coords(s.to_string())),
        };
        Ok(Coords::from_file_rank(file as usize, rank as usize))
    }
}

// The 8-direction frontier propagation. Left/right-leaning shifts mask the
// opponent set to stop runs from wrapping across rows.
fn legal_moves_impl(self_bits: BitBoard, opponent: BitBoard) -> BitBoard {
    let center = opponent & CENTER_6X6;
    let columns = opponent & MIDDLE_6_FILES;
    // First iteration inlined into the initializers.
    let mut southeast = center & (self_bits << 9);
    let mut northwest = center & (self_bits >> 9);
    let mut south = opponent & (self_bits << 8);
    let mut north = opponent & (self_bits >> 8);
    let mut southwest = center & (self_bits << 7);
    let mut northeast = center & (self_bits >> 7);
    let mut east = columns & (self_bits << 1);
    let mut west = columns & (self_bits >> 1);
    // At most six opponent disks can be flipped in one direction.
    for _ in 0..6 {
        southeast |= center & (southeast << 9);
        northwest |= center & (northwest >> 9);
        south |= opponent & (south << 8);
        north |= opponent & (north >> 8);
        southwest |= center & (southwest << 7);
        northeast |= center & (northeast >> 7);
        east |= columns & (east << 1);
        west |= columns & (west >> 1);
    }
    let candidates = (southeast << 9)
        | (northwest >> 9)
        | (south << 8)
        | (north >> 8)
        | (southwest << 7)
        | (northeast >> 7)
        | (east << 1)
        | (west >> 1);
    candidates & !(self_bits | opponent)
}

/// Disk placement for both sides. The two bitboards are always disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    pub black: BitBoard,
    pub white: BitBoard,
}

impl Board {
    /// The standard opening position.
    pub const START: Board = Board {
        black: 0x0000_0008_1000_0000,
        white: 0x0000_0010_0800_0000,
    };

    /// A board with no disks. Also the empty-slot marker in caches.
    pub const EMPTY: Board = Board { black: 0, white: 0 };

    /// Parses a 64-character row-major representation with the given glyphs.
    pub fn read(repr: &str, black: char, white: char, space: char) -> Result<Board, ParseError> {
        let mut board = Board::EMPTY;
        let mut count = 0;
        for (i, c) in repr.chars().enumerate() {
            if i >= CELL_COUNT {
                return Err(ParseError::Length {
                    expected: CELL_COUNT,
                    actual: repr.chars().count(),
                });
            }
            if c == black {
                board.black |= 1 << i;
            } else if c == white {
                board.white |= 1 << i;
            } else if c != space {
                return Err(ParseError::Glyph(c));
            }
            count += 1;
        }
        if count != CELL_COUNT {
            return Err(ParseError::Length {
                expected: CELL_COUNT,
                actual: count,
            });
        }
        Ok(board)
    }

    /// Renders the 64-character row-major representation.
    pub fn render(&self, black: char, white: char, space: char) -> String {
        (0..CELL_COUNT)
            .map(|i| {
                if self.black & (1 << i) != 0 {
                    black
                } else if self.white & (1 << i) != 0 {
                    white
                } else {
                    space
                }
            })
            .collect()
    }

    #[inline]
    pub fn is_black(&self, coords: Coords) -> bool {
        self.black & coords.bit() != 0
    }

    #[inline]
    pub fn is_white(&self, coords: Coords) -> bool {
        self.white & coords.bit() != 0
    }

    #[inline]
    pub fn count_black(&self) -> i32 {
        self.black.count_ones() as i32
    }

    #[inline]
    pub fn count_white(&self) -> i32 {
        self.white.count_ones() as i32
    }

    #[inline]
    pub fn count_total(&self) -> i32 {
        (self.black | self.white).count_ones() as i32
    }

    #[inline]
    pub fn count_empty(&self) -> i32 {
        CELL_COUNT as i32 - self.count_total()
    }

    /// Black disks minus white disks.
    #[inline]
    pub fn disk_difference(&self) -> i32 {
        self.count_black() - self.count_white()
    }

    /// Squares where `color` has a legal move.
    pub fn find_legal_moves(&self, color: Color) -> BitBoard {
        match color {
            Color::Black => legal_moves_impl(self.black, self.white),
            Color::White => legal_moves_impl(self.white, self.black),
        }
    }

    #[inline]
    pub fn swap_colors(&mut self) {
        std::mem::swap(&mut self.black, &mut self.white);
    }
}

impl Default for Board {
    fn default() -> Board {
        Board::START
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render('X', 'O', '-'))
    }
}
