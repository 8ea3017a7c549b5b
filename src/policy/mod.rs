//! Movement policies for every agent on the board.
//!
//! Players flee, the ghost chases. Both build per-direction weights on top of
//! the shared [`MovementCore`] and draw from them with [`select_weighted`].

use crate::rng::RandomSource;
use crate::types::{Direction, MapSize, Position, WallSet};

mod ghost;
mod player;
mod weighting;

pub use self::ghost::GhostPolicy;
pub use self::player::PlayerPolicy;
pub use self::weighting::{select_weighted, DirectionWeights, MovementCore, MovementHistory};

/// Read-only view of the board an agent plans against.
///
/// For a player, `players` holds the *other* active players; for the ghost it
/// holds every active player.
#[derive(Clone, Copy, Debug)]
pub struct Board<'a> {
    pub map_size: MapSize,
    pub walls: &'a WallSet,
    pub ghost: Option<Position>,
    pub players: &'a [Position],
}

pub trait MovementPolicy {
    /// Direction to step from `current`, or [`Direction::STAY`].
    fn next_move(
        &mut self,
        current: Position,
        board: &Board<'_>,
        rng: &mut dyn RandomSource,
    ) -> Direction;
}
