//! Flip resolution tables
//!
//! Disk flipping is resolved per line: the four lines through the placed
//! square are compressed to 8-bit rows, looked up in tables built at compile
//! time, and the flipped pattern is expanded back onto the board.

use crate::bits::{
    compress_by_mask, expand_by_mask, shift_east, shift_northeast, shift_northwest,
    shift_southeast, shift_southwest, shift_west, BitBoard, CELL_COUNT,
};

// Bitmasks for the four lines crossing a specific cell.
// Example for a 4x4 board:
// In    Out0  Out1  Out2  Out3
// ....  ....  ..*.  .*..  ...*
// ..*.  ****  ..*.  ..*.  ..*.
// ....  ....  ..*.  ...*  .*..
// ....  ....  ..*.  ....  *...
const fn generate_lines() -> [[BitBoard; 4]; CELL_COUNT] {
    let mut res = [[0; 4]; CELL_COUNT];
    let mut i = 0;
    while i < CELL_COUNT {
        let bit = 1u64 << i;
        res[i] = [bit; 4];
        let mut j = 0;
        while j < 7 {
            res[i][0] |= shift_west(res[i][0]) | shift_east(res[i][0]);
            res[i][1] |= (res[i][1] << 8) | (res[i][1] >> 8);
            res[i][2] |= shift_northwest(res[i][2]) | shift_southeast(res[i][2]);
            res[i][3] |= shift_southwest(res[i][3]) | shift_northeast(res[i][3]);
            j += 1;
        }
        i += 1;
    }
    res
}

// Position of a cell within each of the four lines crossing it.
const fn generate_pos_in_line() -> [[u8; 4]; CELL_COUNT] {
    let mut res = [[0; 4]; CELL_COUNT];
    let mut i = 0;
    while i < CELL_COUNT {
        let r = (i / 8) as u8;
        let c = (i % 8) as u8;
        let min_rc = if r < c { r } else { c };
        let min_rc7 = if r < 7 - c { r } else { 7 - c };
        res[i] = [c, r, min_rc, min_rc7];
        i += 1;
    }
    res
}

// Given the placed disk's position in an 8-bit row and the opponent row
// occupancy, the self-disks that would bracket flips on either side.
// Example:
// Self:      ...*.... (as the bit index 3)
// Opponent:  .**.*.**
// Outflanks: *....*..
const fn generate_outflanks() -> [[u8; 256]; 8] {
    let mut res = [[0u8; 256]; 8];
    let mut i = 0;
    while i < 8 {
        let bit = 1u8 << i;
        let mut j = 0;
        while j < 256 {
            let opponent = (j as u8) | bit;
            if (bit << 1) & opponent != 0 {
                let mut s = bit;
                while s & opponent != 0 {
                    s <<= 1;
                }
                res[i][j] |= s;
            }
            if (bit >> 1) & opponent != 0 {
                let mut s = bit;
                while s & opponent != 0 {
                    s >>= 1;
                }
                res[i][j] |= s;
            }
            j += 1;
        }
        i += 1;
    }
    res
}

// Given the placed disk's position and the outflank pattern, the flipped
// disks together with the newly placed one.
// Example:
// Self:      ...*.... (as the bit index 3)
// Outflanks: *....*..
// Flips:     .****...
const fn generate_flips() -> [[u8; 256]; 8] {
    let mut res = [[0u8; 256]; 8];
    let mut i = 0;
    while i < 8 {
        let bit = 1u8 << i;
        let mut j = 0usize;
        while j < 256 {
            if j & bit as usize != 0 || (j as u8).count_ones() > 2 {
                j += 1;
                continue;
            }
            if j > bit as usize {
                let mut s = bit;
                while s & j as u8 == 0 {
                    res[i][j] |= s;
                    s <<= 1;
                }
            }
            if j & (bit as usize - 1) != 0 {
                let mut s = bit;
                while s & j as u8 == 0 {
                    res[i][j] |= s;
                    s >>= 1;
                }
            }
            j += 1;
        }
        i += 1;
    }
    res
}

// Flip count does not include the newly placed disk.
const fn generate_flip_counts() -> [[u8; 256]; 8] {
    let flips = generate_flips();
    let mut res = [[0u8; 256]; 8];
    let mut i = 0;
    while i < 8 {
        let mut j = 0;
        while j < 256 {
            let f = flips[i][j];
            res[i][j] = if f == 0 { 0 } else { (f.count_ones() - 1) as u8 };
            j += 1;
        }
        i += 1;
    }
    res
}

static LINE_TABLE: [[BitBoard; 4]; CELL_COUNT] = generate_lines();
static POS_IN_LINE: [[u8; 4]; CELL_COUNT] = generate_pos_in_line();
static OUTFLANKS: [[u8; 256]; 8] = generate_outflanks();
static FLIPS: [[u8; 256]; 8] = generate_flips();
static FLIP_COUNTS: [[u8; 256]; 8] = generate_flip_counts();

/// Returns the disks flipped by placing a self-disk at square `placed`,
/// including the placed bit itself. Yields zero for a placement that flips
/// nothing (i.e. an illegal move).
pub fn find_flips(placed: usize, self_bits: BitBoard, opponent: BitBoard) -> BitBoard {
    debug_assert!(placed < CELL_COUNT);
    let lines = &LINE_TABLE[placed];
    let pos = &POS_IN_LINE[placed];
    let mut flips = 0;
    for dir in 0..4 {
        let self_row = compress_by_mask(self_bits, lines[dir]) as u8;
        let opp_row = compress_by_mask(opponent, lines[dir]) as u8;
        let outflank = OUTFLANKS[pos[dir] as usize][opp_row as usize] & self_row;
        let flip_row = FLIPS[pos[dir] as usize][outflank as usize];
        flips |= expand_by_mask(flip_row as BitBoard, lines[dir]);
    }
    flips
}

/// Returns only the number of opponent disks flipped by placing at `placed`,
/// excluding the placed bit. Cheaper than [`find_flips`] for leaf counting.
pub fn count_flips(placed: usize, self_bits: BitBoard, opponent: BitBoard) -> i32 {
    debug_assert!(placed < CELL_COUNT);
    let lines = &LINE_TABLE[placed];
    let pos = &POS_IN_LINE[placed];
    let mut flips = 0;
    for dir in 0..4 {
        let self_row = compress_by_mask(self_bits, lines[dir]) as u8;
        let opp_row = compress_by_mask(opponent, lines[dir]) as u8;
        let outflank = OUTFLANKS[pos[dir] as usize][opp_row as usize] & self_row;
        flips += FLIP_COUNTS[pos[dir] as usize][outflank as usize] as i32;
    }
    flips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::SetBits;

    // Walk all eight directions from the placed square, the slow way.
    fn naive_flips(placed: usize, self_bits: BitBoard, opponent: BitBoard) -> BitBoard {
        let (r0, c0) = ((placed / 8) as i32, (placed % 8) as i32);
        let mut flips = 0u64;
        for (dr, dc) in [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ] {
            let mut run = 0u64;
            let (mut r, mut c) = (r0 + dr, c0 + dc);
            while (0..8).contains(&r) && (0..8).contains(&c) {
                let bit = 1u64 << (r * 8 + c);
                if opponent & bit != 0 {
                    run |= bit;
                } else {
                    if self_bits & bit != 0 {
                        flips |= run;
                    }
                    break;
                }
                r += dr;
                c += dc;
            }
        }
        if flips != 0 {
            flips |= 1 << placed;
        }
        flips
    }

    #[test]
    fn opening_moves_flip_one_disk() {
        let black = 0x0000_0008_1000_0000u64;
        let white = 0x0000_0010_0800_0000u64;
        // d3 flips d4.
        assert_eq!(find_flips(19, black, white), (1 << 19) | (1 << 27));
        assert_eq!(count_flips(19, black, white), 1);
        // c4 flips d4.
        assert_eq!(find_flips(26, black, white), (1 << 26) | (1 << 27));
        // f5 flips e5.
        assert_eq!(find_flips(37, black, white), (1 << 37) | (1 << 36));
        // e6 flips e5.
        assert_eq!(find_flips(44, black, white), (1 << 44) | (1 << 36));
    }

    #[test]
    fn multi_direction_flips() {
        // Self on a1 and h8 rows around an opponent run: d4 brackets in
        // several directions at once.
        let self_bits = (1u64 << 0) | (1 << 7) | (1 << 63) | (1 << 24);
        let opponent = (1u64 << 9) | (1 << 18) | (1 << 36) | (1 << 45) | (1 << 54) | (1 << 28) | (1 << 29);
        let flips = find_flips(27, self_bits, opponent);
        let expected = (1u64 << 27) | (1 << 9) | (1 << 18) | (1 << 36) | (1 << 45) | (1 << 54);
        assert_eq!(flips, expected);
        assert_eq!(count_flips(27, self_bits, opponent), 5);
    }

    #[test]
    fn no_bracket_no_flip() {
        // Opponent disk with no self disk beyond it flips nothing, and an
        // unflipping placement yields an empty mask entirely.
        let self_bits = 1u64 << 0;
        let opponent = 1u64 << 1;
        assert_eq!(find_flips(3, self_bits, opponent), 0);
        assert_eq!(count_flips(3, self_bits, opponent), 0);
    }

    #[test]
    fn matches_naive_reference_over_playouts() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let mut state = crate::game::GameState::new();
            loop {
                if state.legal_moves() == 0 {
                    state.play(crate::board::Coords::NONE);
                    if state.legal_moves() == 0 {
                        break;
                    }
                    continue;
                }
                let self_bits = state.own_disks();
                let opponent = state.opponent_disks();
                for placed in SetBits(state.legal_moves()) {
                    let fast = find_flips(placed, self_bits, opponent);
                    assert_eq!(fast, naive_flips(placed, self_bits, opponent));
                    assert_eq!(count_flips(placed, self_bits, opponent), fast.count_ones() as i32 - 1);
                }
                let moves: Vec<usize> = SetBits(state.legal_moves()).collect();
                let pick = moves[rng.gen_range(0..moves.len())];
                state.play(crate::board::Coords::new(pick));
            }
        }
    }
}
