//! Evaluator training
//!
//! Epoch training over a generated dataset plus the outer loop that
//! alternates dataset generation with training rounds.

use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rothello_core::eval::{DataPoint, Dataset, Evaluator, LearnableEvaluator};

use crate::selfplay::{generate_dataset, DataGenerationOptions};

/// Knobs for [`train_evaluator`].
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub seed: Option<u64>,
    pub show_progress: bool,
}

impl Default for TrainOptions {
    fn default() -> TrainOptions {
        TrainOptions {
            epochs: 20,
            batch_size: 32,
            learning_rate: 0.01,
            seed: None,
            show_progress: true,
        }
    }
}

/// Knobs for [`training_loop`].
#[derive(Debug, Clone)]
pub struct TrainingLoopOptions {
    pub iterations: usize,
    pub data_generation: DataGenerationOptions,
    pub train: TrainOptions,
    /// Master seed from which per-iteration generation and training seeds
    /// are derived when those are left unset.
    pub seed: Option<u64>,
    pub show_progress: bool,
}

impl Default for TrainingLoopOptions {
    fn default() -> TrainingLoopOptions {
        TrainingLoopOptions {
            iterations: 10,
            data_generation: DataGenerationOptions::default(),
            train: TrainOptions::default(),
            seed: None,
            show_progress: true,
        }
    }
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn dataset_mse<E: Evaluator + ?Sized>(dataset: &[DataPoint], evaluator: &E, batch_size: usize) -> f32 {
    if dataset.is_empty() {
        return 0.0;
    }
    let mut total_se = 0.0f32;
    for batch in dataset.chunks(batch_size) {
        let mut batch_se = 0.0f32;
        for (board, bounds) in batch {
            let error = bounds.error(evaluator.evaluate(board));
            batch_se += error * error;
        }
        total_se += batch_se;
    }
    total_se / dataset.len() as f32
}

/// Fits `evaluator` to `dataset` for a fixed number of epochs, shuffling
/// between epochs and reporting the initial and latest mean squared error.
pub fn train_evaluator<E: LearnableEvaluator + ?Sized>(
    evaluator: &mut E,
    dataset: &mut Dataset,
    options: &TrainOptions,
) {
    let mut rng = seeded_rng(options.seed);
    let bar = options.show_progress.then(|| {
        let bar = ProgressBar::new(options.epochs as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("valid template"),
        );
        bar
    });
    let initial_mse = dataset_mse(dataset, evaluator, options.batch_size);
    for _ in 0..options.epochs {
        dataset.shuffle(&mut rng);
        let mse = evaluator.optimize(dataset, options.batch_size, options.learning_rate);
        if let Some(bar) = &bar {
            bar.set_message(format!("MSE: {initial_mse} -> {mse}"));
            bar.inc(1);
        }
    }
    if let Some(bar) = bar {
        bar.finish();
    }
}

/// Alternates dataset generation and training for a number of rounds,
/// invoking `on_iteration_finished` after each one (the usual place to
/// save a checkpoint).
pub fn training_loop<E: LearnableEvaluator>(
    evaluator: &mut E,
    mut options: TrainingLoopOptions,
    mut on_iteration_finished: impl FnMut(&E, usize),
) {
    let mut rng = seeded_rng(options.seed);
    let derive_generation_seed = options.data_generation.seed.is_none();
    let derive_train_seed = options.train.seed.is_none();
    for iteration in 0..options.iterations {
        if options.show_progress {
            println!("=== Iteration {} ===", iteration + 1);
        }
        if derive_generation_seed {
            options.data_generation.seed = Some(rng.gen());
        }
        if derive_train_seed {
            options.train.seed = Some(rng.gen());
        }
        let mut dataset = generate_dataset(&*evaluator, &options.data_generation);
        train_evaluator(evaluator, &mut dataset, &options.train);
        on_iteration_finished(evaluator, iteration);
    }
}
