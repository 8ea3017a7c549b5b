use std::collections::{HashSet, VecDeque};

use crate::constants::{
    BACK_OFF_CHANCE, BACK_OFF_DISTANCE, BACK_OFF_FACTOR, CHASE_BONUS, CLUSTER_BONUS_PER_PLAYER,
    CLUSTER_RADIUS, CORNERED_BONUS, CORNERED_ESCAPE_ROUTES, OPTIMAL_AXIS_BONUS, PATTERN_BONUS,
    PREDICTION_BLEND, TARGET_HISTORY_LEN,
};
use crate::grid::valid_directions;
use crate::rng::RandomSource;
use crate::types::{Direction, GhostLevel, Position};

use super::weighting::{select_weighted, DirectionWeights, MovementCore};
use super::{Board, MovementPolicy};

/// Pursuit policy with four escalating strategies.
#[derive(Clone, Debug, Default)]
pub struct GhostPolicy {
    core: MovementCore,
    level: GhostLevel,
    target_history: VecDeque<Position>,
    discovered: HashSet<Position>,
}

impl GhostPolicy {
    pub fn new(level: GhostLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn level(&self) -> GhostLevel {
        self.level
    }

    pub fn set_level(&mut self, level: GhostLevel) {
        self.level = level;
    }

    pub fn core(&self) -> &MovementCore {
        &self.core
    }

    pub fn discovered_cells(&self) -> usize {
        self.discovered.len()
    }

    pub fn target_history(&self) -> impl Iterator<Item = &Position> {
        self.target_history.iter()
    }

    fn remember_target(&mut self, target: Position) {
        self.target_history.push_back(target);
        while self.target_history.len() > TARGET_HISTORY_LEN {
            self.target_history.pop_front();
        }
    }

    /// Linear extrapolation of the target's last recorded step.
    fn predict_target(&self, target: Position) -> Position {
        let len = self.target_history.len();
        if len < 2 {
            return target;
        }
        let prev = self.target_history[len - 2];
        let last = self.target_history[len - 1];
        Position::new(target.x + last.x - prev.x, target.y + last.y - prev.y)
    }

    /// Half a point for every recent target step that matches `dir`.
    fn pattern_score(&self, dir: Direction) -> f32 {
        let len = self.target_history.len();
        if len < 3 {
            return 0.0;
        }
        let recent: Vec<Position> = self.target_history.iter().skip(len - 3).copied().collect();
        recent
            .windows(2)
            .filter(|pair| Direction::between(pair[0], pair[1]) == Some(dir))
            .count() as f32
            * PATTERN_BONUS
    }

    pub(crate) fn weigh(
        &self,
        current: Position,
        target: Position,
        candidates: &[Direction],
        board: &Board<'_>,
        rng: &mut dyn RandomSource,
    ) -> DirectionWeights {
        let mut weights = self.core.direction_weights(candidates);
        match self.level {
            GhostLevel::Basic => {
                let distance = current.manhattan(target);
                for dir in candidates {
                    if current.offset(*dir).manhattan(target) < distance {
                        weights.add(*dir, CHASE_BONUS);
                    }
                }
            }
            GhostLevel::Predictive => {
                let predicted = self.predict_target(target);
                for dir in candidates {
                    let next = current.offset(*dir);
                    let score = 1.0 / (next.manhattan(target) + 1) as f32
                        + PREDICTION_BLEND / (next.manhattan(predicted) + 1) as f32;
                    weights.add(*dir, score * CHASE_BONUS);
                }
            }
            GhostLevel::Strategic => {
                let escape_routes =
                    valid_directions(target, board.map_size, board.walls, &[]).len();
                let cornered = escape_routes <= CORNERED_ESCAPE_ROUTES;
                for dir in candidates {
                    let mut score = 1.0 / (current.offset(*dir).manhattan(target) + 1) as f32;
                    if cornered {
                        score += CORNERED_BONUS;
                    }
                    weights.add(*dir, score * CHASE_BONUS);
                }
            }
            GhostLevel::Advanced => {
                let optimal = optimal_axis_direction(current, target);
                let nearby = board
                    .players
                    .iter()
                    .filter(|player| current.manhattan(**player) <= CLUSTER_RADIUS)
                    .count();
                let backing_off = current.manhattan(target) < BACK_OFF_DISTANCE
                    && rng.chance(BACK_OFF_CHANCE);
                for dir in candidates {
                    let mut score = 0.0;
                    if *dir == optimal {
                        score += OPTIMAL_AXIS_BONUS;
                    }
                    score += self.pattern_score(*dir);
                    if nearby > 1 {
                        score += nearby as f32 * CLUSTER_BONUS_PER_PLAYER;
                    }
                    if backing_off {
                        score *= BACK_OFF_FACTOR;
                    }
                    weights.add(*dir, score);
                }
            }
        }
        weights
    }
}

/// Step along whichever axis has the larger offset to the target; ties go
/// to the vertical axis.
fn optimal_axis_direction(current: Position, target: Position) -> Direction {
    let dx = target.x - current.x;
    let dy = target.y - current.y;
    if dx.abs() > dy.abs() {
        if dx > 0 {
            Direction::RIGHT
        } else {
            Direction::LEFT
        }
    } else if dy > 0 {
        Direction::DOWN
    } else {
        Direction::UP
    }
}

/// Nearest player by Manhattan distance; the earliest wins ties.
fn closest_player(current: Position, players: &[Position]) -> Option<Position> {
    let mut best: Option<(Position, i32)> = None;
    for player in players {
        let distance = current.manhattan(*player);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((*player, distance)),
        }
    }
    best.map(|(player, _)| player)
}

impl MovementPolicy for GhostPolicy {
    fn next_move(
        &mut self,
        current: Position,
        board: &Board<'_>,
        rng: &mut dyn RandomSource,
    ) -> Direction {
        let candidates = valid_directions(current, board.map_size, board.walls, &[]);
        let Some(target) = closest_player(current, board.players) else {
            return candidates
                .get(rng.pick_index(candidates.len()))
                .copied()
                .unwrap_or(Direction::STAY);
        };

        self.remember_target(target);
        self.discovered.insert(current);
        if candidates.is_empty() {
            return Direction::STAY;
        }

        let weights = self.weigh(current, target, &candidates, board, rng);
        let Some(chosen) = select_weighted(&weights, rng) else {
            return Direction::STAY;
        };
        self.core.record(current, chosen);
        chosen
    }
}
