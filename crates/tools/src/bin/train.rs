//! Self-play training driver.
//!
//! Loads an existing model (or seeds a fresh one with the classic pattern
//! set), runs the generate-then-train loop, and writes a checkpoint after
//! every iteration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rothello_core::bits::BitBoard;
use rothello_core::eval::LinearPatternEvaluator;
use tools::selfplay::DataGenerationOptions;
use tools::trainer::{training_loop, TrainOptions, TrainingLoopOptions};

// Ranks two to four, diagonals of length four to eight, the 3x3 and 2x5
// corner blocks, and the edge with its two X-squares.
const DEFAULT_PATTERNS: [BitBoard; 11] = [
    0x0000_0000_0000_ff00,
    0x0000_0000_00ff_0000,
    0x0000_0000_ff00_0000,
    0x8040_2010_0804_0201,
    0x0080_4020_1008_0402,
    0x0000_8040_2010_0804,
    0x0000_0080_4020_1008,
    0x0000_0000_8040_2010,
    0x0000_0000_0007_0707,
    0x0000_0000_0000_1f1f,
    0x0000_0000_0000_42ff,
];

#[derive(Parser, Debug)]
#[command(about = "Self-play training loop for the linear pattern evaluator")]
struct Cli {
    /// Model file; loaded when present, created otherwise
    #[arg(long, default_value = "model.dat")]
    model: PathBuf,

    /// Number of weight stages for a freshly created model
    #[arg(long, default_value_t = 4)]
    stages: usize,

    /// Number of generate-then-train rounds
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Self-play games per round
    #[arg(long, default_value_t = 100)]
    games: usize,

    /// Midgame search depth during data generation
    #[arg(long, default_value_t = 8)]
    midgame_depth: i32,

    /// Empty-square threshold for exact endgame solving
    #[arg(long, default_value_t = 16)]
    endgame_depth: i32,

    /// Opening plies played uniformly at random
    #[arg(long, default_value_t = 6)]
    initial_random_moves: i32,

    /// Probability of a random move after the opening
    #[arg(long, default_value_t = 0.01)]
    epsilon: f64,

    /// Worker threads for data generation
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Disable per-disk-count rebalancing of the harvested rows
    #[arg(long)]
    no_phase_balancing: bool,

    /// Training epochs per round
    #[arg(long, default_value_t = 20)]
    epochs: usize,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.01)]
    learning_rate: f32,

    /// Master seed for reproducible rounds
    #[arg(long)]
    seed: Option<u64>,

    /// Checkpoint path prefix; each round writes `<prefix>-NNN.dat`
    #[arg(long, default_value = "checkpoint")]
    checkpoint_prefix: String,

    /// Suppress progress bars and per-round banners
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut eval = if cli.model.exists() {
        log::info!("continuing from {}", cli.model.display());
        LinearPatternEvaluator::load_file(&cli.model)
            .with_context(|| format!("failed to load model {}", cli.model.display()))?
    } else {
        log::info!("creating a fresh model with {} stages", cli.stages);
        let mut eval = LinearPatternEvaluator::new(&DEFAULT_PATTERNS, cli.stages);
        let mut rng = match cli.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        eval.randomize_weights(&mut rng);
        eval
    };

    let options = TrainingLoopOptions {
        iterations: cli.iterations,
        data_generation: DataGenerationOptions {
            total_games: cli.games,
            midgame_search_depth: cli.midgame_depth,
            endgame_solve_depth: cli.endgame_depth,
            balance_phases: !cli.no_phase_balancing,
            initial_random_moves: cli.initial_random_moves,
            epsilon: cli.epsilon,
            worker_count: cli.workers,
            seed: None,
            show_progress: !cli.quiet,
        },
        train: TrainOptions {
            epochs: cli.epochs,
            batch_size: cli.batch_size,
            learning_rate: cli.learning_rate,
            seed: None,
            show_progress: !cli.quiet,
        },
        seed: cli.seed,
        show_progress: !cli.quiet,
    };

    let prefix = cli.checkpoint_prefix.clone();
    training_loop(&mut eval, options, |eval, iteration| {
        let path = PathBuf::from(format!("{prefix}-{:03}.dat", iteration + 1));
        match eval.save_file(&path) {
            Ok(()) => log::info!("saved checkpoint {}", path.display()),
            Err(err) => log::error!("failed to save checkpoint {}: {err}", path.display()),
        }
    });

    eval.save_file(&cli.model)
        .with_context(|| format!("failed to save model {}", cli.model.display()))?;
    Ok(())
}
