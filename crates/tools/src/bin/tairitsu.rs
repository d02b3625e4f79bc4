//! Line-protocol frontend adapter.
//!
//! Reads commands from stdin, one per line, and answers on stdout. See
//! `rothello_core::protocol` for the command language.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use rothello_core::protocol::{Response, Session};

fn main() -> Result<()> {
    env_logger::init();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut session = Session::new();
    for line in stdin.lock().lines() {
        let line = line?;
        match session.handle(&line) {
            Response::Reply(reply) => {
                writeln!(stdout, "{reply}")?;
                stdout.flush()?;
            }
            Response::Silent => {}
            Response::Quit => break,
        }
    }
    Ok(())
}
