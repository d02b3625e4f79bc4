//! Line protocol for external frontends
//!
//! A small stdio-friendly command language: a [`Session`] turns one input
//! line into one reply. Commands are `set <hex32><hex32><b|w>`, `show`,
//! `load <path> <midDepth> <endDepth>`, `play <aa|pass>`, `suggest`,
//! `analyze` and `quit`. Any failed command answers `error` and leaves the
//! session usable; unknown commands are ignored.

use std::path::Path;

use crate::arena::SearchingPlayer;
use crate::board::{Board, Color, Coords};
use crate::eval::LinearPatternEvaluator;
use crate::game::GameState;
use crate::search::{EndgameSolver, MidgameSearcher};

/// What the driver should do with one processed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Print this reply.
    Reply(String),
    /// Print nothing.
    Silent,
    /// Tear the session down.
    Quit,
}

/// One interactive game session holding a position and an optional loaded
/// model.
#[derive(Default)]
pub struct Session {
    state: GameState,
    model: Option<SearchingPlayer>,
}

impl Session {
    pub fn new() -> Session {
        Session {
            state: GameState::new(),
            model: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Processes one input line.
    pub fn handle(&mut self, line: &str) -> Response {
        let mut parts = line.split_whitespace();
        let result = match parts.next() {
            Some("set") => self.set_state(parts.next()),
            Some("show") => Some(self.report_state()),
            Some("load") => self.load_model(parts.next(), parts.next(), parts.next()),
            Some("play") => self.play(parts.next()),
            Some("suggest") => self.suggest(),
            Some("analyze") => self.analyze(),
            Some("quit") => return Response::Quit,
            _ => return Response::Silent,
        };
        match result {
            Some(reply) => Response::Reply(reply),
            None => Response::Reply("error".to_string()),
        }
    }

    fn set_state(&mut self, arg: Option<&str>) -> Option<String> {
        let arg = arg?;
        if arg.len() != 33 || !arg.is_ascii() {
            return None;
        }
        let black = u64::from_str_radix(&arg[..16], 16).ok()?;
        let white = u64::from_str_radix(&arg[16..32], 16).ok()?;
        if black & white != 0 {
            return None;
        }
        let color = match &arg[32..] {
            "b" => Color::Black,
            "w" => Color::White,
            _ => return None,
        };
        self.state = GameState::from_board_and_color(Board { black, white }, color);
        Some(self.report_state())
    }

    fn report_state(&self) -> String {
        let board = self.state.board();
        format!(
            "{:016x}{:016x}{}{:016x}{}",
            board.black,
            board.white,
            match self.state.current() {
                Color::Black => 'b',
                Color::White => 'w',
            },
            self.state.legal_moves(),
            if self.state.is_terminal() { '+' } else { '-' },
        )
    }

    fn load_model(
        &mut self,
        path: Option<&str>,
        midgame_depth: Option<&str>,
        endgame_depth: Option<&str>,
    ) -> Option<String> {
        let path = path?;
        let midgame_depth: i32 = midgame_depth?.parse().ok()?;
        let endgame_depth: i32 = endgame_depth?.parse().ok()?;
        if midgame_depth <= 0 || endgame_depth <= 0 {
            return None;
        }
        let eval = match LinearPatternEvaluator::load_file(Path::new(path)) {
            Ok(eval) => eval,
            Err(err) => {
                log::warn!("failed to load model {path}: {err}");
                return None;
            }
        };
        self.model = Some(SearchingPlayer::new(
            Box::new(eval),
            midgame_depth,
            endgame_depth,
        ));
        Some(format!("loaded {path}"))
    }

    fn play(&mut self, arg: Option<&str>) -> Option<String> {
        let arg = arg?;
        if self.state.legal_moves() == 0 {
            if arg != "pass" {
                return None;
            }
            self.state.play(Coords::NONE);
            return Some(self.report_state());
        }
        let mv: Coords = arg.parse().ok()?;
        if self.state.legal_moves() & mv.bit() == 0 {
            return None;
        }
        self.state.play(mv);
        Some(self.report_state())
    }

    fn suggest(&mut self) -> Option<String> {
        let model = self.model.as_mut()?;
        let mv = model.get_move(&self.state);
        Some(mv.to_string())
    }

    // Scores every legal reply one move deep: exact endgame evaluation in
    // range of the model's solve depth, otherwise a midgame search one ply
    // shallower than the model's own.
    fn analyze(&mut self) -> Option<String> {
        let model = self.model.as_ref()?;
        let state = self.state;
        let mut evals: Vec<(Coords, f32)> = Vec::new();
        if state.board().count_empty() > model.endgame_depth() {
            let depth = model.midgame_depth() - 1;
            let mut searcher = MidgameSearcher::new();
            analyze_moves(&state, &mut evals, |child| {
                searcher.evaluate(child, model.evaluator(), depth).score
            });
        } else {
            let mut solver = EndgameSolver::new();
            analyze_moves(&state, &mut evals, |child| {
                solver.evaluate(child).score as f32
            });
        }
        evals.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut reply = String::new();
        for (mv, score) in evals {
            reply.push_str(&format!("{mv} {score} "));
        }
        Some(reply)
    }
}

fn analyze_moves(
    state: &GameState,
    evals: &mut Vec<(Coords, f32)>,
    mut evaluate: impl FnMut(&GameState) -> f32,
) {
    if state.legal_moves() == 0 {
        let child = state.play_copied(Coords::NONE);
        evals.push((Coords::NONE, -evaluate(&child)));
        return;
    }
    for mv in crate::bits::SetBits(state.legal_moves()).map(Coords::new) {
        let child = state.play_copied(mv);
        evals.push((mv, -evaluate(&child)));
    }
}
