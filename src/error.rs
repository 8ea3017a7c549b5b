use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// The roster already holds `max_players` players.
    CapacityExceeded { max_players: usize },
    /// No valid, unoccupied cell was left to place a player on.
    NoFreeCell,
    /// The game has already ended; a new player would reopen it.
    GameOver,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { max_players } => {
                write!(f, "player capacity exceeded (max {max_players})")
            }
            Self::NoFreeCell => write!(f, "no free cell available for a new player"),
            Self::GameOver => write!(f, "game is over, no players can join"),
        }
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;
