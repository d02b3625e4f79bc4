//! Tournament ladder persistence
//!
//! The human-readable result sheet kept between tournament runs: a player
//! count, one `name elo` line per player, then the full win/draw/loss
//! matrix with cells separated by two spaces, one row per line.

use std::io::{self, Read, Write};

/// Accumulated results of one pairing, from the row player's perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub wins: u64,
    pub draws: u64,
    pub losses: u64,
}

impl MatchStats {
    pub fn total(&self) -> u64 {
        self.wins + self.draws + self.losses
    }

    /// Tournament points: a win is worth one, a draw half.
    pub fn score(&self) -> f32 {
        (self.wins * 2 + self.draws) as f32 / 2.0
    }
}

impl std::ops::AddAssign for MatchStats {
    fn add_assign(&mut self, other: MatchStats) {
        self.wins += other.wins;
        self.draws += other.draws;
        self.losses += other.losses;
    }
}

/// A rated ladder entry. Names contain no whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRating {
    pub name: String,
    pub elo: f32,
}

/// The ladder sheet: ratings plus the pairwise result matrix, indexed
/// `[row][column]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsFile {
    pub players: Vec<PlayerRating>,
    pub matrix: Vec<Vec<MatchStats>>,
}

fn bad_data(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

impl StatsFile {
    /// Creates an empty sheet for `names`, all at the given floor rating.
    pub fn with_players(names: &[&str], elo: f32) -> StatsFile {
        StatsFile {
            players: names
                .iter()
                .map(|&name| PlayerRating {
                    name: name.to_string(),
                    elo,
                })
                .collect(),
            matrix: vec![vec![MatchStats::default(); names.len()]; names.len()],
        }
    }

    /// Parses a sheet. The format is whitespace-tolerant.
    pub fn load<R: Read>(mut reader: R) -> io::Result<StatsFile> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut tokens = text.split_whitespace();
        let mut next = |what: &str| {
            tokens
                .next()
                .ok_or_else(|| bad_data(&format!("missing {what}")))
        };

        let size: usize = next("player count")?
            .parse()
            .map_err(|_| bad_data("invalid player count"))?;
        let mut players = Vec::with_capacity(size);
        for _ in 0..size {
            let name = next("player name")?.to_string();
            let elo: f32 = next("player rating")?
                .parse()
                .map_err(|_| bad_data("invalid rating"))?;
            players.push(PlayerRating { name, elo });
        }
        let mut matrix = vec![vec![MatchStats::default(); size]; size];
        for row in matrix.iter_mut() {
            for cell in row.iter_mut() {
                for (what, slot) in [
                    ("win count", &mut cell.wins),
                    ("draw count", &mut cell.draws),
                    ("loss count", &mut cell.losses),
                ] {
                    *slot = next(what)?
                        .parse()
                        .map_err(|_| bad_data(&format!("invalid {what}")))?;
                }
            }
        }
        Ok(StatsFile { players, matrix })
    }

    /// Writes the sheet in its canonical layout.
    pub fn save<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let size = self.players.len();
        assert_eq!(self.matrix.len(), size, "matrix does not match the roster");
        writeln!(writer, "{size}")?;
        for player in &self.players {
            writeln!(writer, "{} {}", player.name, player.elo)?;
        }
        for row in &self.matrix {
            assert_eq!(row.len(), size, "matrix does not match the roster");
            for (i, cell) in row.iter().enumerate() {
                if i != 0 {
                    write!(writer, "  ")?;
                }
                write!(writer, "{} {} {}", cell.wins, cell.draws, cell.losses)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text() {
        let mut sheet = StatsFile::with_players(&["rand", "gen-001", "gen-002"], 100.0);
        sheet.players[1].elo = 1523.5;
        sheet.matrix[0][1] = MatchStats {
            wins: 3,
            draws: 1,
            losses: 16,
        };
        sheet.matrix[1][0] = MatchStats {
            wins: 16,
            draws: 1,
            losses: 3,
        };

        let mut bytes = Vec::new();
        sheet.save(&mut bytes).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("3\nrand 100\n"));
        assert!(text.contains("3 1 16"));

        let loaded = StatsFile::load(bytes.as_slice()).unwrap();
        assert_eq!(loaded, sheet);
    }

    #[test]
    fn rejects_truncated_sheets() {
        assert!(StatsFile::load("2\nonly_one 100\n".as_bytes()).is_err());
        assert!(StatsFile::load("x\n".as_bytes()).is_err());
        let missing_cells = "1\np 100\n1 2\n";
        assert!(StatsFile::load(missing_cells.as_bytes()).is_err());
    }

    #[test]
    fn stats_arithmetic() {
        let mut stats = MatchStats {
            wins: 2,
            draws: 1,
            losses: 3,
        };
        assert_eq!(stats.total(), 6);
        assert_eq!(stats.score(), 2.5);
        stats += MatchStats {
            wins: 1,
            draws: 0,
            losses: 1,
        };
        assert_eq!(stats.total(), 8);
    }
}
