//! Opening seed list
//!
//! One opening per line, written as concatenated two-character coordinates
//! applied from the standard start position. Tournament play samples an
//! opening and a random element of the diagonal-preserving symmetry
//! subgroup, so both sides see the same variety of positions.

use std::io::{self, BufRead};

use rand::Rng;

use crate::board::Coords;
use crate::game::GameState;

use super::RandomPlayer;

fn invalid<E: std::fmt::Display>(line_no: usize, err: E) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("opening line {line_no}: {err}"),
    )
}

/// Parses an openings file into ready-to-play states.
pub fn load_openings<R: BufRead>(reader: R) -> io::Result<Vec<GameState>> {
    let mut openings = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        let line_no = index + 1;
        if line.len() % 2 != 0 {
            return Err(invalid(line_no, "odd number of coordinate characters"));
        }
        let mut state = GameState::new();
        for chunk in line.as_bytes().chunks(2) {
            let text = std::str::from_utf8(chunk).map_err(|e| invalid(line_no, e))?;
            let mv: Coords = text.parse().map_err(|e| invalid(line_no, e))?;
            if state.legal_moves() & mv.bit() == 0 {
                return Err(invalid(line_no, format!("illegal opening move {mv}")));
            }
            state.play(mv);
        }
        openings.push(state);
    }
    Ok(openings)
}

/// Samples an opening and applies a random diagonal-preserving symmetry
/// (identity, either diagonal mirror, or their composition, the half turn).
/// With no openings available, falls back to six random plies.
pub fn random_opening<R: Rng + ?Sized>(openings: &[GameState], rng: &mut R) -> GameState {
    if openings.is_empty() {
        let player = RandomPlayer;
        let mut state = GameState::new();
        for _ in 0..6 {
            state.play(player.get_move(&state, rng));
        }
        return state;
    }
    let mut state = openings[rng.gen_range(0..openings.len())];
    let flip = rng.gen_range(0..4u32);
    if flip & 1 != 0 {
        state.mirror_main_diagonal();
    }
    if flip & 2 != 0 {
        state.mirror_anti_diagonal();
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn loads_openings_line_by_line() {
        let text = "f5\nf5d6c3\n";
        let openings = load_openings(text.as_bytes()).unwrap();
        assert_eq!(openings.len(), 2);
        assert_eq!(openings[0].board().count_total(), 5);
        assert_eq!(openings[1].board().count_total(), 7);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(load_openings("f5d".as_bytes()).is_err());
        assert!(load_openings("zz".as_bytes()).is_err());
        // a1 is not a legal first move.
        assert!(load_openings("a1".as_bytes()).is_err());
    }

    #[test]
    fn random_opening_stays_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let openings = load_openings("f5d6\nf5f6\n".as_bytes()).unwrap();
        for _ in 0..20 {
            let state = random_opening(&openings, &mut rng);
            assert_eq!(state.board().count_total(), 6);
            assert_eq!(
                state.legal_moves(),
                state.board().find_legal_moves(state.current())
            );
        }
        // The empty list falls back to six random plies.
        let fallback = random_opening(&[], &mut rng);
        assert!(fallback.board().count_total() <= 10);
    }
}
