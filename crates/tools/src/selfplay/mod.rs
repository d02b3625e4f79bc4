//! Self-play dataset generation
//!
//! Workers play games against themselves with the searching pipeline and
//! harvest labels from three sources: the principal score of each midgame
//! search, every transposition-table entry of those searches (interval
//! labels), and the exact endgame solve plus its table once the game enters
//! solving range. Workers run on scoped threads; the calling thread doubles
//! as the last worker. One mutex guards the aggregated dataset and the
//! progress bar, taken once per finished game.

use std::sync::Mutex;
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rothello_core::arena::RandomPlayer;
use rothello_core::bits::CELL_COUNT;
use rothello_core::board::Coords;
use rothello_core::eval::{Dataset, Evaluator};
use rothello_core::game::GameState;
use rothello_core::search::{EndgameSolver, MidgameSearcher};
use rothello_core::tt::Bounds;

/// Knobs for [`generate_dataset`].
#[derive(Debug, Clone)]
pub struct DataGenerationOptions {
    /// Number of self-play games across all workers.
    pub total_games: usize,
    /// Fixed depth of the midgame searches.
    pub midgame_search_depth: i32,
    /// Empty-square threshold at which games are solved exactly.
    pub endgame_solve_depth: i32,
    /// Rebalance the harvested rows across disk counts.
    pub balance_phases: bool,
    /// Number of opening plies played uniformly at random.
    pub initial_random_moves: i32,
    /// Probability of replacing the principal move with a random one.
    pub epsilon: f64,
    /// Number of workers; the calling thread is one of them.
    pub worker_count: usize,
    /// Master seed. Each game derives its own generator from it, so the
    /// harvested rows do not depend on how games are split over workers.
    pub seed: Option<u64>,
    pub show_progress: bool,
}

impl Default for DataGenerationOptions {
    fn default() -> DataGenerationOptions {
        DataGenerationOptions {
            total_games: 100,
            midgame_search_depth: 8,
            endgame_solve_depth: 16,
            balance_phases: true,
            initial_random_moves: 6,
            epsilon: 0.01,
            worker_count: 1,
            seed: None,
            show_progress: true,
        }
    }
}

/// Generates a training dataset by self-play with `eval` steering the
/// midgame searches.
pub fn generate_dataset(eval: &dyn Evaluator, options: &DataGenerationOptions) -> Dataset {
    Generator::new(eval, options).run()
}

struct Shared {
    dataset: Dataset,
    bar: Option<ProgressBar>,
    harvested: usize,
}

struct Generator<'a> {
    eval: &'a dyn Evaluator,
    options: &'a DataGenerationOptions,
    shared: Mutex<Shared>,
}

impl<'a> Generator<'a> {
    fn new(eval: &'a dyn Evaluator, options: &'a DataGenerationOptions) -> Generator<'a> {
        assert!(options.worker_count > 0, "at least one worker is required");
        if options.balance_phases {
            let start = 4 + options.initial_random_moves;
            let stop = CELL_COUNT as i32 - options.endgame_solve_depth;
            assert!(start < stop, "no midgame range left to balance against");
        }
        let bar = options.show_progress.then(|| {
            let bar = ProgressBar::new(options.total_games as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                    .expect("valid template"),
            );
            bar
        });
        Generator {
            eval,
            options,
            shared: Mutex::new(Shared {
                dataset: Vec::new(),
                bar,
                harvested: 0,
            }),
        }
    }

    fn run(self) -> Dataset {
        let workers = self.options.worker_count;
        let games_per_worker = self.options.total_games / workers;
        let remainder = self.options.total_games % workers;
        // Worker i owns a contiguous block of game indices; the first
        // `remainder` workers take one extra game.
        let first_game = |id: usize| id * games_per_worker + id.min(remainder);
        let game_count = |id: usize| games_per_worker + usize::from(id < remainder);
        thread::scope(|scope| {
            let this = &self;
            for id in 1..workers {
                let first = first_game(id);
                let count = game_count(id);
                scope.spawn(move || this.work(id, first, count));
            }
            this.work(0, first_game(0), game_count(0));
        });
        let mut shared = self.shared.into_inner().unwrap();
        if let Some(bar) = shared.bar.take() {
            bar.finish();
        }
        shared.dataset
    }

    fn work(&self, worker_id: usize, first_game: usize, count: usize) {
        let mut local: Dataset = Vec::new();
        let mut searcher = MidgameSearcher::new();
        let mut solver = EndgameSolver::new();
        for game_index in first_game..first_game + count {
            let mut rng = match self.options.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(game_index as u64)),
                None => ChaCha8Rng::from_entropy(),
            };
            let old_size = local.len();
            self.play_game(&mut rng, &mut searcher, &mut solver, &mut local);
            self.update_progress(worker_id, local.len() - old_size);
        }
        let mut shared = self.shared.lock().unwrap();
        shared.dataset.append(&mut local);
    }

    fn play_game(
        &self,
        rng: &mut ChaCha8Rng,
        searcher: &mut MidgameSearcher,
        solver: &mut EndgameSolver,
        local: &mut Dataset,
    ) {
        let opt = self.options;
        let old_size = local.len();
        let mut state = GameState::new();
        loop {
            if state.legal_moves() == 0 {
                state.play(Coords::NONE);
                if state.legal_moves() == 0 {
                    return;
                }
                continue;
            }
            let totals = state.board().count_total();
            if CELL_COUNT as i32 - totals <= opt.endgame_solve_depth {
                let middle_size = local.len();
                let solved = solver.solve(&state);
                local.push((state.canonical_board(), Bounds::exact(solved.score as f32)));
                local.extend(solver.transposition_table().entries().map(|(board, bounds)| {
                    (
                        board,
                        Bounds {
                            lower: bounds.lower as f32,
                            upper: bounds.upper as f32,
                        },
                    )
                }));
                solver.clear_transposition_table();
                if opt.balance_phases {
                    balance_phases(local, old_size, middle_size, opt, rng);
                }
                return;
            }
            let searched = searcher.search(&state, self.eval, opt.midgame_search_depth);
            local.push((state.canonical_board(), Bounds::exact(searched.score)));
            local.extend(searcher.transposition_table().entries());
            let explore = totals - 4 < opt.initial_random_moves || rng.gen_bool(opt.epsilon);
            let mv = if explore {
                RandomPlayer.get_move(&state, rng)
            } else {
                searched.best_move
            };
            state.play(mv);
        }
    }

    fn update_progress(&self, worker_id: usize, increment: usize) {
        let mut shared = self.shared.lock().unwrap();
        shared.harvested += increment;
        if let Some(bar) = &shared.bar {
            bar.set_message(format!(
                "[worker {worker_id:>3}] dataset rows: {}",
                shared.harvested
            ));
            bar.inc(1);
        }
    }
}

// The endgame block just appended dwarfs the per-disk-count row counts of
// the midgame block. Cap each disk count at the midgame average so the
// training signal stays level across game phases: shuffle the block, keep
// rows only while their disk count is under the target, drop the rest.
fn balance_phases(
    local: &mut Dataset,
    old_size: usize,
    middle_size: usize,
    options: &DataGenerationOptions,
    rng: &mut ChaCha8Rng,
) {
    let mut hist = [0usize; CELL_COUNT + 1];
    for (board, _) in &local[old_size..middle_size] {
        hist[board.count_total() as usize] += 1;
    }
    let start = (4 + options.initial_random_moves) as usize;
    let stop = CELL_COUNT - options.endgame_solve_depth as usize;
    let target = hist[start..stop].iter().sum::<usize>() / (stop - start);

    local[middle_size..].shuffle(rng);
    let mut kept = middle_size;
    for i in middle_size..local.len() {
        let disks = local[i].0.count_total() as usize;
        if hist[disks] >= target {
            continue;
        }
        hist[disks] += 1;
        local.swap(i, kept);
        kept += 1;
    }
    local.truncate(kept);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat;

    impl Evaluator for Flat {
        fn evaluate(&self, board: &rothello_core::board::Board) -> f32 {
            board.disk_difference() as f32
        }

        fn clone_box(&self) -> Box<dyn Evaluator> {
            Box::new(Flat)
        }
    }

    fn quick_options() -> DataGenerationOptions {
        DataGenerationOptions {
            total_games: 2,
            midgame_search_depth: 2,
            endgame_solve_depth: 6,
            balance_phases: false,
            initial_random_moves: 6,
            epsilon: 0.05,
            worker_count: 1,
            seed: Some(7),
            show_progress: false,
        }
    }

    #[test]
    fn generates_labelled_rows() {
        let dataset = generate_dataset(&Flat, &quick_options());
        assert!(!dataset.is_empty());
        for (board, bounds) in &dataset {
            assert_eq!(board.black & board.white, 0);
            assert!(bounds.lower <= bounds.upper);
            assert!(board.count_total() >= 4);
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let first = generate_dataset(&Flat, &quick_options());
        let second = generate_dataset(&Flat, &quick_options());
        assert_eq!(first.len(), second.len());
        assert!(first
            .iter()
            .zip(&second)
            .all(|(a, b)| a.0 == b.0 && a.1 == b.1));
    }

    #[test]
    fn balancing_caps_endgame_rows() {
        let mut balanced_options = quick_options();
        balanced_options.balance_phases = true;
        let balanced = generate_dataset(&Flat, &balanced_options);
        let unbalanced = generate_dataset(&Flat, &quick_options());
        assert!(balanced.len() <= unbalanced.len());
    }
}
