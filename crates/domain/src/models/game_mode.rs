//! Game modes and the seat capacity each one implies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seats at a table running a full-size game.
pub const BASE_CAPACITY: usize = 2;

/// Seats at a table running a skirmish-sized game.
pub const SKIRMISH_CAPACITY: usize = 4;

/// Game played at a table for one night.
///
/// The first occupant of a table picks the mode; everyone joining later
/// must play the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "40k")]
    Warhammer40k,
    #[serde(rename = "killteam")]
    KillTeam,
    #[serde(rename = "aos_spearhead")]
    AosSpearhead,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [
        GameMode::Warhammer40k,
        GameMode::KillTeam,
        GameMode::AosSpearhead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Warhammer40k => "40k",
            GameMode::KillTeam => "killteam",
            GameMode::AosSpearhead => "aos_spearhead",
        }
    }

    /// Returns true for the small-board modes that seat four.
    pub fn is_skirmish(&self) -> bool {
        matches!(self, GameMode::KillTeam | GameMode::AosSpearhead)
    }

    /// Number of players a table running this mode can seat.
    pub fn capacity(&self) -> usize {
        if self.is_skirmish() {
            SKIRMISH_CAPACITY
        } else {
            BASE_CAPACITY
        }
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "40k" => Ok(GameMode::Warhammer40k),
            "killteam" => Ok(GameMode::KillTeam),
            "aos_spearhead" => Ok(GameMode::AosSpearhead),
            _ => Err(format!("Invalid game mode: {}", s)),
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
