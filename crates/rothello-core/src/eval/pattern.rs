//! Linear pattern evaluator
//!
//! A pattern is a mask of up to ten squares; the joint {empty, self,
//! opponent} occupancy of those squares indexes a learned weight. A board is
//! scored by summing, at the current game stage, the weights of every
//! pattern over all of its dihedral images. Patterns are stored under their
//! canonical (lexicographically minimal) D4 form, and reflection-symmetric
//! patterns fold mirrored occupancies onto one weight slot.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use rand::Rng;

use crate::bits::{
    compress_by_mask, expand_by_mask, mirror_horizontal, mirror_main_diagonal, rotate_180,
    rotate_90_ccw, rotate_90_cw, BitBoard, CELL_COUNT,
};
use crate::board::Board;

use super::{DataPoint, Evaluator, LearnableEvaluator};

/// Maximum number of squares in a pattern.
pub const MAX_PATTERN_SIZE: usize = 10;

const POWERS_OF_3: [u16; MAX_PATTERN_SIZE + 1] = {
    let mut res = [1u16; MAX_PATTERN_SIZE + 1];
    let mut i = 1;
    while i < res.len() {
        res[i] = res[i - 1] * 3;
        i += 1;
    }
    res
};

// Reinterpret a binary number as a ternary number.
const fn generate_binary_to_ternary() -> [u16; 1 << MAX_PATTERN_SIZE] {
    let mut table = [0u16; 1 << MAX_PATTERN_SIZE];
    let mut i = 0;
    while i < table.len() {
        let mut j = 0;
        while j < MAX_PATTERN_SIZE {
            if i & (1 << j) != 0 {
                table[i] += POWERS_OF_3[j];
            }
            j += 1;
        }
        i += 1;
    }
    table
}

static BINARY_TO_TERNARY: [u16; 1 << MAX_PATTERN_SIZE] = generate_binary_to_ternary();

#[inline]
fn extract_pattern(self_bits: BitBoard, opponent: BitBoard, mask: BitBoard) -> u16 {
    let own = compress_by_mask(self_bits, mask) as usize;
    let opp = compress_by_mask(opponent, mask) as usize;
    BINARY_TO_TERNARY[own] + 2 * BINARY_TO_TERNARY[opp]
}

// All 8 rotoreflections, rotations first.
fn transform_d4(mask: BitBoard) -> [BitBoard; 8] {
    let flip = mirror_main_diagonal(mask);
    [
        mask,
        rotate_90_ccw(mask),
        rotate_180(mask),
        rotate_90_cw(mask),
        flip,
        rotate_90_ccw(flip),
        rotate_180(flip),
        rotate_90_cw(flip),
    ]
}

fn find_pattern_canonical_form(mask: BitBoard) -> BitBoard {
    transform_d4(mask).into_iter().min().unwrap()
}

/// The residual symmetry of a canonical pattern mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    None,
    Diagonal,
    Axial,
}

fn find_pattern_symmetry(mask: BitBoard) -> Symmetry {
    if mask == mirror_horizontal(mask) {
        Symmetry::Axial
    } else if mask == mirror_main_diagonal(mask) {
        Symmetry::Diagonal
    } else {
        Symmetry::None
    }
}

// Maps every raw ternary index to the smaller of itself and its reflected
// counterpart, then compresses the surviving indices to a dense range.
fn generate_pattern_index_map(mask: BitBoard, symmetry: Symmetry) -> Vec<u16> {
    let size = mask.count_ones() as usize;
    assert!(size <= MAX_PATTERN_SIZE, "pattern is too large");

    let mut map: Vec<u16> = (0..POWERS_OF_3[size]).collect();
    if symmetry == Symmetry::None {
        return map;
    }

    let reflect = match symmetry {
        Symmetry::Diagonal => mirror_main_diagonal,
        Symmetry::Axial => mirror_horizontal,
        Symmetry::None => unreachable!(),
    };
    for own in 0..1usize << size {
        for opp in 0..1usize << size {
            if own & opp != 0 {
                continue;
            }
            let first = BINARY_TO_TERNARY[own] + 2 * BINARY_TO_TERNARY[opp];
            let own_bits = reflect(expand_by_mask(own as BitBoard, mask));
            let opp_bits = reflect(expand_by_mask(opp as BitBoard, mask));
            let second = extract_pattern(own_bits, opp_bits, mask);
            map[first as usize] = first.min(second);
        }
    }

    // Compress unused indices out of the range.
    let mut occupied = vec![false; map.len()];
    for &m in &map {
        occupied[m as usize] = true;
    }
    let mut compressed = vec![0u16; map.len()];
    let mut next = 0u16;
    for (i, &used) in occupied.iter().enumerate() {
        if used {
            compressed[i] = next;
            next += 1;
        }
    }
    for m in &mut map {
        *m = compressed[*m as usize];
    }
    map
}

#[derive(Clone)]
struct Pattern {
    mask: BitBoard,
    symmetry: Symmetry,
    index_map: Vec<u16>,
    count: usize,
    weights: Vec<f32>,
    gradients: Vec<f32>,
}

impl Pattern {
    fn new(mask: BitBoard, stages: usize) -> Pattern {
        let mask = find_pattern_canonical_form(mask);
        let symmetry = find_pattern_symmetry(mask);
        let index_map = generate_pattern_index_map(mask, symmetry);
        let count = *index_map.iter().max().unwrap() as usize + 1;
        Pattern {
            mask,
            symmetry,
            index_map,
            count,
            weights: vec![0.0; stages * count],
            gradients: vec![0.0; stages * count],
        }
    }

    #[inline]
    fn orbit_size(&self) -> usize {
        if self.symmetry == Symmetry::None {
            8
        } else {
            4
        }
    }

    fn reset_gradients(&mut self) {
        self.gradients.fill(0.0);
    }

    fn apply_gradients(&mut self) {
        for (w, g) in self.weights.iter_mut().zip(&self.gradients) {
            *w -= g;
        }
    }
}

/// A learnable evaluator summing per-stage pattern weights.
#[derive(Clone)]
pub struct LinearPatternEvaluator {
    stages: usize,
    patterns: Vec<Pattern>,
}

impl LinearPatternEvaluator {
    /// Builds an evaluator with zeroed weights over the given pattern masks.
    ///
    /// Panics if `stages` is zero or any mask has more than
    /// [`MAX_PATTERN_SIZE`] squares.
    pub fn new(patterns: &[BitBoard], stages: usize) -> LinearPatternEvaluator {
        assert!(stages > 0, "at least one stage is required");
        LinearPatternEvaluator {
            stages,
            patterns: patterns.iter().map(|&m| Pattern::new(m, stages)).collect(),
        }
    }

    /// Appends another pattern with zeroed weights.
    pub fn add_pattern(&mut self, mask: BitBoard) {
        self.patterns.push(Pattern::new(mask, self.stages));
    }

    #[inline]
    pub fn stages(&self) -> usize {
        self.stages
    }

    /// The canonical masks of the stored patterns.
    pub fn pattern_masks(&self) -> Vec<BitBoard> {
        self.patterns.iter().map(|p| p.mask).collect()
    }

    /// Overwrites all weights with small random values. The spread is
    /// arbitrary; it only matters that the evaluator stops being constant.
    pub fn randomize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let spread = 1.0 / self.patterns.len().max(1) as f32;
        for pattern in &mut self.patterns {
            for weight in &mut pattern.weights {
                *weight = rng.gen_range(-spread..spread);
            }
        }
    }

    fn stage_of(&self, board: &Board) -> usize {
        let filled = (board.count_total() - 4).max(0) as usize;
        filled * self.stages / (CELL_COUNT - 4)
    }

    /// Reads a model from a byte stream.
    pub fn load(reader: &mut dyn Read) -> io::Result<LinearPatternEvaluator> {
        let stages = read_u64(reader)? as usize;
        if stages == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "model declares zero stages",
            ));
        }
        let mut res = LinearPatternEvaluator {
            stages,
            patterns: Vec::new(),
        };
        loop {
            let mask = read_u64(reader)?;
            if mask == 0 {
                return Ok(res);
            }
            if mask.count_ones() as usize > MAX_PATTERN_SIZE {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("pattern mask {mask:#018x} is too large"),
                ));
            }
            let mut pattern = Pattern::new(mask, stages);
            for weight in &mut pattern.weights {
                *weight = read_f32(reader)?;
            }
            res.patterns.push(pattern);
        }
    }

    /// Reads a model from a file.
    pub fn load_file(path: &Path) -> io::Result<LinearPatternEvaluator> {
        let mut reader = BufReader::new(File::open(path)?);
        LinearPatternEvaluator::load(&mut reader)
    }

    /// Writes the model to a file.
    pub fn save_file(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        LearnableEvaluator::save(self, &mut writer)
    }
}

impl Evaluator for LinearPatternEvaluator {
    fn evaluate(&self, board: &Board) -> f32 {
        let stage = self.stage_of(board);
        if stage == self.stages {
            return board.disk_difference() as f32;
        }
        let self_d4 = transform_d4(board.black);
        let opp_d4 = transform_d4(board.white);
        let mut res = 0.0f32;
        for pattern in &self.patterns {
            let weights = &pattern.weights[stage * pattern.count..(stage + 1) * pattern.count];
            for k in 0..pattern.orbit_size() {
                let idx = extract_pattern(self_d4[k], opp_d4[k], pattern.mask);
                res += weights[pattern.index_map[idx as usize] as usize];
            }
        }
        res
    }

    fn clone_box(&self) -> Box<dyn Evaluator> {
        Box::new(self.clone())
    }
}

impl LearnableEvaluator for LinearPatternEvaluator {
    fn optimize(&mut self, dataset: &[DataPoint], batch_size: usize, learning_rate: f32) -> f32 {
        assert!(batch_size > 0, "batch size must be positive");
        if dataset.is_empty() {
            return 0.0;
        }
        let mut total_se = 0.0f32;
        let mut touched: Vec<(usize, usize)> = Vec::with_capacity(self.patterns.len() * 8);
        let mut start = 0;
        while start < dataset.len() {
            let end = (start + batch_size).min(dataset.len());
            for pattern in &mut self.patterns {
                pattern.reset_gradients();
            }
            let mult = 2.0 * learning_rate / (end - start) as f32;
            let mut batch_se = 0.0f32;
            for (board, bounds) in &dataset[start..end] {
                let stage = self.stage_of(board);
                if stage == self.stages {
                    continue;
                }
                touched.clear();
                let self_d4 = transform_d4(board.black);
                let opp_d4 = transform_d4(board.white);
                let mut predicted = 0.0f32;
                for (pi, pattern) in self.patterns.iter().enumerate() {
                    let base = stage * pattern.count;
                    for k in 0..pattern.orbit_size() {
                        let idx = extract_pattern(self_d4[k], opp_d4[k], pattern.mask);
                        let slot = base + pattern.index_map[idx as usize] as usize;
                        touched.push((pi, slot));
                        predicted += pattern.weights[slot];
                    }
                }
                let error = bounds.error(predicted);
                if error == 0.0 {
                    continue;
                }
                batch_se += error * error;
                let grad = (mult * error).clamp(-2.0, 2.0);
                for &(pi, slot) in &touched {
                    self.patterns[pi].gradients[slot] += grad;
                }
            }
            total_se += batch_se;
            for pattern in &mut self.patterns {
                pattern.apply_gradients();
            }
            start = end;
        }
        total_se / dataset.len() as f32
    }

    fn save(&self, writer: &mut dyn Write) -> io::Result<()> {
        write_u64(writer, self.stages as u64)?;
        for pattern in &self.patterns {
            write_u64(writer, pattern.mask)?;
            for &weight in &pattern.weights {
                write_f32(writer, weight)?;
            }
        }
        write_u64(writer, 0)
    }
}

fn read_u64(reader: &mut dyn Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f32(reader: &mut dyn Read) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn write_u64(writer: &mut dyn Write, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn write_f32(writer: &mut dyn Write, value: f32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Coords;
    use crate::game::GameState;
    use crate::tt::Bounds;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const EDGE_2X: BitBoard = 0x42ff;
    const CORNER_3X3: BitBoard = 0x070707;
    const DIAG_8: BitBoard = 0x8040_2010_0804_0201;

    fn sample_boards() -> Vec<Board> {
        use rand::Rng;
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut boards = Vec::new();
        for _ in 0..20 {
            let mut state = GameState::new();
            loop {
                if state.legal_moves() == 0 {
                    state.play(Coords::NONE);
                    if state.legal_moves() == 0 {
                        break;
                    }
                    continue;
                }
                boards.push(state.canonical_board());
                let moves: Vec<usize> = crate::bits::SetBits(state.legal_moves()).collect();
                state.play(Coords::new(moves[rng.gen_range(0..moves.len())]));
            }
        }
        boards
    }

    #[test]
    fn patterns_are_stored_canonically() {
        let eval = LinearPatternEvaluator::new(&[EDGE_2X, CORNER_3X3, DIAG_8, 0xff00], 2);
        for (&input, &stored) in [EDGE_2X, CORNER_3X3, DIAG_8, 0xff00]
            .iter()
            .zip(&eval.pattern_masks())
        {
            let minimum = transform_d4(input).into_iter().min().unwrap();
            assert_eq!(stored, minimum);
        }
    }

    #[test]
    fn symmetry_detection() {
        // The a1 corner block is symmetric about the main diagonal.
        assert_eq!(
            find_pattern_symmetry(find_pattern_canonical_form(CORNER_3X3)),
            Symmetry::Diagonal
        );
        // The full main diagonal likewise.
        assert_eq!(
            find_pattern_symmetry(find_pattern_canonical_form(DIAG_8)),
            Symmetry::Diagonal
        );
        // A full rank is mirror-symmetric left to right.
        assert_eq!(
            find_pattern_symmetry(find_pattern_canonical_form(0xff)),
            Symmetry::Axial
        );
        assert_eq!(
            find_pattern_symmetry(find_pattern_canonical_form(EDGE_2X)),
            Symmetry::Axial
        );
    }

    #[test]
    fn index_map_folds_symmetric_indices() {
        let mask = find_pattern_canonical_form(0x0707); // 2x3 corner block, no symmetry
        assert_eq!(find_pattern_symmetry(mask), Symmetry::None);
        let map = generate_pattern_index_map(mask, Symmetry::None);
        assert_eq!(map.len(), 3usize.pow(6));
        // Identity without symmetry.
        assert!(map.iter().enumerate().all(|(i, &m)| i == m as usize));

        let sym_mask = find_pattern_canonical_form(CORNER_3X3);
        let sym_map = generate_pattern_index_map(sym_mask, Symmetry::Diagonal);
        let count = *sym_map.iter().max().unwrap() as usize + 1;
        // Folding shrinks the index space but keeps it dense.
        assert!(count < 3usize.pow(9));
        let mut seen = vec![false; count];
        for &m in &sym_map {
            seen[m as usize] = true;
        }
        assert!(seen.into_iter().all(|b| b));
    }

    #[test]
    #[should_panic(expected = "too large")]
    fn oversized_pattern_aborts() {
        let _ = LinearPatternEvaluator::new(&[0x7ff], 1);
    }

    #[test]
    fn evaluation_is_d4_invariant() {
        let mut eval = LinearPatternEvaluator::new(&[EDGE_2X, CORNER_3X3, DIAG_8], 4);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        eval.randomize_weights(&mut rng);
        for board in sample_boards() {
            let reference = eval.evaluate(&board);
            for transform in [
                mirror_horizontal,
                crate::bits::mirror_vertical,
                mirror_main_diagonal,
                crate::bits::mirror_anti_diagonal,
                rotate_180,
                rotate_90_cw,
                rotate_90_ccw,
            ] {
                let image = Board {
                    black: transform(board.black),
                    white: transform(board.white),
                };
                let value = eval.evaluate(&image);
                assert!(
                    (value - reference).abs() < 1e-3,
                    "transform changed evaluation: {reference} vs {value}"
                );
            }
        }
    }

    #[test]
    fn full_board_falls_through_to_disk_difference() {
        let eval = LinearPatternEvaluator::new(&[EDGE_2X], 4);
        let full = Board {
            black: !0u64 << 30,
            white: (1u64 << 30) - 1,
        };
        assert_eq!(full.count_total(), 64);
        assert_eq!(eval.evaluate(&full), full.disk_difference() as f32);
    }

    #[test]
    fn zero_learning_rate_changes_nothing() {
        let mut eval = LinearPatternEvaluator::new(&[CORNER_3X3], 2);
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        eval.randomize_weights(&mut rng);
        let boards = sample_boards();
        let dataset: Vec<DataPoint> = boards
            .iter()
            .take(64)
            .map(|&b| (b, Bounds::exact(3.0)))
            .collect();
        let before: Vec<f32> = boards.iter().take(8).map(|b| eval.evaluate(b)).collect();
        let mse = eval.optimize(&dataset, 16, 0.0);
        assert!(mse >= 0.0);
        let after: Vec<f32> = boards.iter().take(8).map(|b| eval.evaluate(b)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn single_label_step_reduces_error() {
        let mut eval = LinearPatternEvaluator::new(&[CORNER_3X3, EDGE_2X], 1);
        let board = sample_boards()[10];
        let dataset = vec![(board, Bounds::exact(10.0))];
        let before = (eval.evaluate(&board) - 10.0).abs();
        let mse = eval.optimize(&dataset, 1, 0.001);
        assert!((mse - before * before).abs() < 1e-3);
        let after = (eval.evaluate(&board) - 10.0).abs();
        assert!(after < before);
    }

    #[test]
    fn interval_labels_inside_are_free() {
        let mut eval = LinearPatternEvaluator::new(&[CORNER_3X3], 1);
        let board = sample_boards()[3];
        // Zero-weight prediction is 0, comfortably inside the interval.
        let dataset = vec![(board, Bounds::new(-30.0, 30.0))];
        let mse = eval.optimize(&dataset, 8, 0.01);
        assert_eq!(mse, 0.0);
        assert_eq!(eval.evaluate(&board), 0.0);
    }

    #[test]
    fn model_round_trips_through_bytes() {
        let mut eval = LinearPatternEvaluator::new(&[EDGE_2X, CORNER_3X3, DIAG_8], 3);
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        eval.randomize_weights(&mut rng);

        let mut bytes = Vec::new();
        LearnableEvaluator::save(&eval, &mut bytes).unwrap();
        let loaded = LinearPatternEvaluator::load(&mut bytes.as_slice()).unwrap();

        assert_eq!(loaded.stages(), eval.stages());
        assert_eq!(loaded.pattern_masks(), eval.pattern_masks());
        for board in sample_boards().into_iter().take(50) {
            assert_eq!(loaded.evaluate(&board), eval.evaluate(&board));
        }
    }

    #[test]
    fn truncated_model_is_a_recoverable_error() {
        let mut eval = LinearPatternEvaluator::new(&[CORNER_3X3], 1);
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        eval.randomize_weights(&mut rng);
        let mut bytes = Vec::new();
        LearnableEvaluator::save(&eval, &mut bytes).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(LinearPatternEvaluator::load(&mut bytes.as_slice()).is_err());
        assert!(LinearPatternEvaluator::load(&mut [0u8; 8].as_slice()).is_err());
    }
}
