use crate::constants::{
    FLEE_BONUS, FLEE_PENALTY, FLEE_RADIUS, RANDOM_MOVE_CHANCE, RECENT_CELL_PENALTY,
};
use crate::grid::valid_directions;
use crate::rng::RandomSource;
use crate::types::{Direction, Position};

use super::weighting::{select_weighted, DirectionWeights, MovementCore};
use super::{Board, MovementPolicy};

/// Flee policy: run from a nearby ghost, avoid recently visited cells, and
/// never step onto another player.
#[derive(Clone, Debug, Default)]
pub struct PlayerPolicy {
    core: MovementCore,
}

impl PlayerPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core(&self) -> &MovementCore {
        &self.core
    }

    pub(crate) fn weigh(&self, current: Position, board: &Board<'_>) -> DirectionWeights {
        let candidates = valid_directions(current, board.map_size, board.walls, board.players);
        let mut weights = self.core.direction_weights(&candidates);

        if let Some(ghost) = board.ghost {
            let distance = current.manhattan(ghost);
            if distance <= FLEE_RADIUS {
                for dir in &candidates {
                    let next_distance = current.offset(*dir).manhattan(ghost);
                    if next_distance > distance {
                        weights.add(*dir, FLEE_BONUS);
                    } else {
                        weights.scale(*dir, FLEE_PENALTY);
                    }
                }
            }
        }

        for dir in &candidates {
            if self.core.history().contains(current.offset(*dir)) {
                weights.scale(*dir, RECENT_CELL_PENALTY);
            }
        }
        weights
    }
}

impl MovementPolicy for PlayerPolicy {
    fn next_move(
        &mut self,
        current: Position,
        board: &Board<'_>,
        rng: &mut dyn RandomSource,
    ) -> Direction {
        let weights = self.weigh(current, board);
        if weights.is_empty() {
            return Direction::STAY;
        }

        let chosen = if rng.chance(RANDOM_MOVE_CHANCE) {
            let live = weights.live_directions();
            live.get(rng.pick_index(live.len())).copied()
        } else {
            select_weighted(&weights, rng)
        };
        let Some(chosen) = chosen else {
            return Direction::STAY;
        };

        self.core.record(current, chosen);
        chosen
    }
}
